//! # Moderation Service
//!
//! Pin/lock toggles (admins) and deletions (author or admin). Each action
//! that changes state appends a `ModerationEvent`.

use std::sync::Arc;

use domains::{
    DomainError, ForumUser, ModerationAction, ModerationEvent, ModerationLog, NewModerationEvent,
    Post, PostPatch, PostRepository, ReplyRepository, Result,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::access::{require_admin, require_author_or_admin};

#[derive(Clone)]
pub struct ModerationService {
    posts: Arc<dyn PostRepository>,
    replies: Arc<dyn ReplyRepository>,
    log: Arc<dyn ModerationLog>,
}

impl ModerationService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        replies: Arc<dyn ReplyRepository>,
        log: Arc<dyn ModerationLog>,
    ) -> Self {
        Self { posts, replies, log }
    }

    pub async fn pin(&self, actor: &ForumUser, post_id: Uuid) -> Result<Post> {
        self.toggle(actor, post_id, ModerationAction::Pin).await
    }

    pub async fn unpin(&self, actor: &ForumUser, post_id: Uuid) -> Result<Post> {
        self.toggle(actor, post_id, ModerationAction::Unpin).await
    }

    pub async fn lock(&self, actor: &ForumUser, post_id: Uuid) -> Result<Post> {
        self.toggle(actor, post_id, ModerationAction::Lock).await
    }

    pub async fn unlock(&self, actor: &ForumUser, post_id: Uuid) -> Result<Post> {
        self.toggle(actor, post_id, ModerationAction::Unlock).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    async fn toggle(
        &self,
        actor: &ForumUser,
        post_id: Uuid,
        action: ModerationAction,
    ) -> Result<Post> {
        require_admin(actor, "pin or lock threads")?;

        let patch = match action {
            ModerationAction::Pin => PostPatch { pinned: Some(true), ..Default::default() },
            ModerationAction::Unpin => PostPatch { pinned: Some(false), ..Default::default() },
            ModerationAction::Lock => PostPatch { locked: Some(true), ..Default::default() },
            ModerationAction::Unlock => PostPatch { locked: Some(false), ..Default::default() },
            ModerationAction::DeletePost | ModerationAction::DeleteReply => {
                return Err(DomainError::validation(format!("{action} is not a toggle")));
            }
        };

        let post = self
            .posts
            .update(post_id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;
        self.record(post_id, actor, action, None).await?;
        info!(%post_id, %action, "thread moderated");
        Ok(post)
    }

    /// Deletes a thread and its replies. Missing threads are a silent no-op.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_post(&self, actor: &ForumUser, post_id: Uuid) -> Result<()> {
        let Some(detail) = self.posts.get_by_id(post_id).await? else {
            return Ok(());
        };
        require_author_or_admin(actor, detail.post.user_id, "delete this thread")?;

        if self.posts.delete(post_id).await? {
            let metadata = json!({
                "title": detail.post.title,
                "category_id": detail.post.category_id,
                "reply_count": detail.post.reply_count,
            });
            self.record(post_id, actor, ModerationAction::DeletePost, Some(metadata))
                .await?;
            info!(%post_id, "thread deleted");
        }
        Ok(())
    }

    /// Deletes a single reply; its children stay in place. Missing replies
    /// are a silent no-op.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_reply(&self, actor: &ForumUser, reply_id: Uuid) -> Result<()> {
        let Some(detail) = self.replies.get_by_id(reply_id).await? else {
            return Ok(());
        };
        require_author_or_admin(actor, detail.reply.user_id, "delete this reply")?;

        if self.replies.delete(reply_id).await? {
            let metadata = json!({ "reply_id": reply_id });
            self.record(detail.reply.post_id, actor, ModerationAction::DeleteReply, Some(metadata))
                .await?;
            info!(%reply_id, "reply deleted");
        }
        Ok(())
    }

    async fn record(
        &self,
        post_id: Uuid,
        actor: &ForumUser,
        action: ModerationAction,
        metadata: Option<serde_json::Value>,
    ) -> Result<ModerationEvent> {
        self.log
            .record_event(NewModerationEvent {
                post_id,
                performed_by: Some(actor.id),
                action,
                metadata,
            })
            .await
    }
}

//! # Reply Service
//!
//! Replies are stored flat with a nullable `parent_id`; the tree is rebuilt
//! in memory on read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domains::{
    AvatarResolver, DomainError, ForumUser, NewReply, PostDetail, PostRepository, RecentReply,
    Reply, ReplyDetail, ReplyRepository, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::access::{require_visible_category, viewer_scope};
use crate::validation::require_text;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub post_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyNode {
    #[serde(flatten)]
    pub reply: ReplyDetail,
    pub children: Vec<ReplyNode>,
}

/// Buckets replies by `parent_id`; the `None` bucket holds top-level replies.
/// Input order is kept within each bucket.
pub fn group_by_parent(replies: Vec<ReplyDetail>) -> HashMap<Option<Uuid>, Vec<ReplyDetail>> {
    let mut groups: HashMap<Option<Uuid>, Vec<ReplyDetail>> = HashMap::new();
    for detail in replies {
        groups.entry(detail.reply.parent_id).or_default().push(detail);
    }
    groups
}

/// Nests replies under their parents. Replies whose parent row is gone are
/// lifted to the top level so they stay reachable.
pub fn build_reply_tree(replies: Vec<ReplyDetail>) -> Vec<ReplyNode> {
    let known: HashSet<Uuid> = replies.iter().map(|r| r.reply.id).collect();
    let mut groups: HashMap<Option<Uuid>, Vec<ReplyDetail>> = HashMap::new();
    for detail in replies {
        let parent = detail.reply.parent_id.filter(|id| known.contains(id));
        groups.entry(parent).or_default().push(detail);
    }
    attach(None, &mut groups)
}

fn attach(
    parent: Option<Uuid>,
    groups: &mut HashMap<Option<Uuid>, Vec<ReplyDetail>>,
) -> Vec<ReplyNode> {
    let Some(level) = groups.remove(&parent) else {
        return Vec::new();
    };
    level
        .into_iter()
        .map(|reply| {
            let children = attach(Some(reply.reply.id), groups);
            ReplyNode { reply, children }
        })
        .collect()
}

#[derive(Clone)]
pub struct ReplyService {
    replies: Arc<dyn ReplyRepository>,
    posts: Arc<dyn PostRepository>,
    avatars: Arc<dyn AvatarResolver>,
    recent_limit: i64,
}

impl ReplyService {
    pub fn new(
        replies: Arc<dyn ReplyRepository>,
        posts: Arc<dyn PostRepository>,
        avatars: Arc<dyn AvatarResolver>,
        recent_limit: i64,
    ) -> Self {
        Self {
            replies,
            posts,
            avatars,
            recent_limit,
        }
    }

    /// Oldest-first flat list for a thread the viewer can see.
    #[instrument(skip(self, user))]
    pub async fn list(&self, user: Option<&ForumUser>, post_id: Uuid) -> Result<Vec<ReplyDetail>> {
        self.require_readable_post(user, post_id).await?;
        let mut replies = self.replies.list_by_post(post_id).await?;
        for detail in &mut replies {
            detail.author.avatar_url = Some(self.avatars.avatar_url(detail.author.user_id));
        }
        Ok(replies)
    }

    /// Same as [`list`](Self::list), nested.
    pub async fn thread(&self, user: Option<&ForumUser>, post_id: Uuid) -> Result<Vec<ReplyNode>> {
        Ok(build_reply_tree(self.list(user, post_id).await?))
    }

    pub async fn get(&self, user: Option<&ForumUser>, reply_id: Uuid) -> Result<ReplyDetail> {
        let mut detail = self
            .replies
            .get_by_id(reply_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reply", reply_id))?;
        self.require_readable_post(user, detail.reply.post_id).await?;
        detail.author.avatar_url = Some(self.avatars.avatar_url(detail.author.user_id));
        Ok(detail)
    }

    /// Latest replies by `author_id` in categories the viewer can see.
    pub async fn recent_by_user(
        &self,
        viewer: Option<&ForumUser>,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<RecentReply>> {
        let limit = limit.unwrap_or(self.recent_limit);
        self.replies
            .list_recent_by_user(author_id, &viewer_scope(viewer), limit)
            .await
    }

    /// Locked threads only accept replies from admins.
    #[instrument(
        skip(self, author, draft),
        fields(author_id = %author.id, post_id = %draft.post_id)
    )]
    pub async fn create(&self, author: &ForumUser, draft: ReplyDraft) -> Result<Reply> {
        require_text("content", &draft.content, None)?;

        let post = self
            .posts
            .get_by_id(draft.post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", draft.post_id))?;
        ensure_post_visible(Some(author), &post)?;
        if post.post.locked && !author.is_admin() {
            return Err(DomainError::authorization("thread is locked"));
        }

        let reply = self
            .replies
            .create(NewReply {
                post_id: draft.post_id,
                user_id: author.id,
                content: draft.content,
                parent_id: draft.parent_id,
            })
            .await?;
        info!(reply_id = %reply.id, "reply created");
        Ok(reply)
    }

    async fn require_readable_post(&self, user: Option<&ForumUser>, post_id: Uuid) -> Result<()> {
        let post = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;
        ensure_post_visible(user, &post)
    }
}

fn ensure_post_visible(user: Option<&ForumUser>, post: &PostDetail) -> Result<()> {
    let category = &post.category;
    require_visible_category(user, category.id, category.access_level, category.is_active)
}

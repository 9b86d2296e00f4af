//! # Post Service
//!
//! Thread listing, search, detail views and authoring. Every read consults
//! the access policy before returning data.

use std::sync::Arc;

use domains::{
    AvatarResolver, CategoryRepository, DomainError, ForumUser, NewPost, Post, PostDetail,
    PostPatch, PostRepository, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::access::{
    accessible_tiers, require_author_or_admin, require_visible_category, viewer_scope,
};
use crate::categories::ensure_visible;
use crate::validation::{require_text, MAX_TITLE_LEN};

/// Input for a new thread; the author comes from the acting user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub category_id: Uuid,
    pub title: String,
    pub content: String,
}

/// Author edits. Pin and lock go through moderation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostEdit {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    avatars: Arc<dyn AvatarResolver>,
    search_limit: i64,
    recent_limit: i64,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        avatars: Arc<dyn AvatarResolver>,
        search_limit: i64,
        recent_limit: i64,
    ) -> Self {
        Self {
            posts,
            categories,
            avatars,
            search_limit,
            recent_limit,
        }
    }

    /// Threads of a category the viewer can see.
    #[instrument(skip(self, user))]
    pub async fn list_by_category(
        &self,
        user: Option<&ForumUser>,
        category_id: Uuid,
    ) -> Result<Vec<Post>> {
        let category = self
            .categories
            .get_by_id(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", category_id))?;
        ensure_visible(user, &category)?;
        self.posts.list_by_category(category_id).await
    }

    /// Relevance search across every category the viewer can see.
    /// Blank terms short-circuit without touching the store.
    #[instrument(skip(self, user, term))]
    pub async fn search(&self, user: Option<&ForumUser>, term: &str) -> Result<Vec<Post>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let tiers = accessible_tiers(user);
        let hits = self.posts.search(term, &tiers, self.search_limit).await?;
        debug!(hits = hits.len(), "search finished");
        Ok(hits)
    }

    /// Latest threads by `author_id`, restricted to categories the viewer can see.
    pub async fn recent_by_user(
        &self,
        viewer: Option<&ForumUser>,
        author_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<Post>> {
        let limit = limit.unwrap_or(self.recent_limit);
        self.posts
            .list_recent_by_user(author_id, &viewer_scope(viewer), limit)
            .await
    }

    /// Thread detail for a viewer. Counts the view without letting a failed
    /// increment fail the read.
    #[instrument(skip(self, user))]
    pub async fn view(&self, user: Option<&ForumUser>, post_id: Uuid) -> Result<PostDetail> {
        let mut detail = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;
        let category = &detail.category;
        require_visible_category(user, category.id, category.access_level, category.is_active)?;
        detail.author.avatar_url = Some(self.avatars.avatar_url(detail.author.user_id));

        if let Err(err) = self.posts.increment_view_count(post_id).await {
            warn!(%post_id, error = %err, "view count increment failed");
        }
        Ok(detail)
    }

    #[instrument(
        skip(self, author, draft),
        fields(author_id = %author.id, category_id = %draft.category_id)
    )]
    pub async fn create(&self, author: &ForumUser, draft: PostDraft) -> Result<Post> {
        require_text("title", &draft.title, Some(MAX_TITLE_LEN))?;
        require_text("content", &draft.content, None)?;

        let category = self
            .categories
            .get_by_id(draft.category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", draft.category_id))?;
        ensure_visible(Some(author), &category)?;

        let post = self
            .posts
            .create(NewPost {
                category_id: draft.category_id,
                user_id: author.id,
                title: draft.title,
                content: draft.content,
            })
            .await?;
        info!(post_id = %post.id, "thread created");
        Ok(post)
    }

    #[instrument(skip(self, actor, edit))]
    pub async fn edit(&self, actor: &ForumUser, post_id: Uuid, edit: PostEdit) -> Result<Post> {
        let detail = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))?;
        require_author_or_admin(actor, detail.post.user_id, "edit this thread")?;

        if let Some(title) = &edit.title {
            require_text("title", title, Some(MAX_TITLE_LEN))?;
        }
        if let Some(content) = &edit.content {
            require_text("content", content, None)?;
        }

        let patch = PostPatch {
            title: edit.title,
            content: edit.content,
            ..Default::default()
        };
        self.posts
            .update(post_id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))
    }
}

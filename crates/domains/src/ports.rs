//! # Ports
//!
//! Storage adapters implement these traits; services only ever see them
//! behind `Arc<dyn ...>`.
//!
//! Every operation touching more than one row runs in a single transaction.
//! Reads return `Ok(None)` for missing rows; deletes of missing rows are
//! successful no-ops.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    Category, CategoryPatch, ModerationEvent, NewCategory, NewModerationEvent, NewPost, NewReply,
    Post, PostDetail, PostPatch, RecentReply, Reply, ReplyDetail, TierSet, ViewerScope,
};

/// Persistence contract for discussion categories.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Active categories whose tier is in `tiers`, by `sort_order` then `name`.
    async fn list_active(&self, tiers: &TierSet) -> Result<Vec<Category>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>>;

    /// Inserts with zeroed counters. Duplicate slug is a `Validation` error.
    async fn create(&self, category: NewCategory) -> Result<Category>;

    /// Patches only the supplied fields. An empty patch returns the row unchanged.
    async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>>;

    /// Removes the category together with its posts and replies.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Persistence contract for threads and their category counters.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Pinned first, then threads without replies, then `last_reply_at` and
    /// `created_at` descending.
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<Post>>;

    /// Relevance-ranked search restricted to active categories in `tiers`.
    async fn search(&self, term: &str, tiers: &TierSet, limit: i64) -> Result<Vec<Post>>;

    /// Newest first, drawn only from categories `scope` admits.
    async fn list_recent_by_user(
        &self,
        user_id: Uuid,
        scope: &ViewerScope,
        limit: i64,
    ) -> Result<Vec<Post>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PostDetail>>;

    /// Atomic `view_count = view_count + 1`.
    async fn increment_view_count(&self, id: Uuid) -> Result<()>;

    /// Inserts the thread and bumps the owning category's `thread_count`,
    /// `post_count` and `last_post_at` in the same transaction.
    async fn create(&self, post: NewPost) -> Result<Post>;

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>>;

    /// Deletes the thread and its replies, then decrements the category by one
    /// thread and `reply_count + 1` posts, floored at zero.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Persistence contract for replies and the counters they drive.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReplyRepository: Send + Sync {
    /// Oldest first. Tree reassembly is left to the caller.
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<ReplyDetail>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReplyDetail>>;

    /// Newest first with the thread title, drawn only from categories `scope` admits.
    async fn list_recent_by_user(
        &self,
        user_id: Uuid,
        scope: &ViewerScope,
        limit: i64,
    ) -> Result<Vec<RecentReply>>;

    /// Inserts the reply and bumps post `reply_count`/`last_reply_at` and
    /// category `post_count`/`last_post_at` atomically.
    async fn create(&self, reply: NewReply) -> Result<Reply>;

    /// Deletes the reply (children are left in place) and decrements the post
    /// and category counters by one, floored at zero.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Append-only moderation audit trail.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ModerationLog: Send + Sync {
    async fn record_event(&self, event: NewModerationEvent) -> Result<ModerationEvent>;
}

/// Maps a user id to a canonical avatar URL. Pure string formatting.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AvatarResolver: Send + Sync {
    fn avatar_url(&self, user_id: Uuid) -> String;
}

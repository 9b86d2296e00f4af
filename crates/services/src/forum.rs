//! # Forum
//!
//! Wires every service against one storage adapter.

use std::sync::Arc;

use domains::{AvatarResolver, CategoryRepository, ModerationLog, PostRepository, ReplyRepository};

use crate::categories::CategoryService;
use crate::moderation::ModerationService;
use crate::posts::PostService;
use crate::replies::ReplyService;

/// Tunables with the defaults the forum pages expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForumOptions {
    /// Maximum search hits returned
    pub search_limit: i64,
    /// Default size of "recent activity" lists
    pub recent_limit: i64,
}

impl Default for ForumOptions {
    fn default() -> Self {
        Self {
            search_limit: 50,
            recent_limit: 5,
        }
    }
}

#[derive(Clone)]
pub struct Forum {
    pub categories: CategoryService,
    pub posts: PostService,
    pub replies: ReplyService,
    pub moderation: ModerationService,
}

impl Forum {
    pub fn new<S>(store: Arc<S>, avatars: Arc<dyn AvatarResolver>, options: ForumOptions) -> Self
    where
        S: CategoryRepository + PostRepository + ReplyRepository + ModerationLog + 'static,
    {
        let categories: Arc<dyn CategoryRepository> = store.clone();
        let posts: Arc<dyn PostRepository> = store.clone();
        let replies: Arc<dyn ReplyRepository> = store.clone();
        let log: Arc<dyn ModerationLog> = store;

        Self {
            categories: CategoryService::new(categories.clone()),
            posts: PostService::new(
                posts.clone(),
                categories,
                avatars.clone(),
                options.search_limit,
                options.recent_limit,
            ),
            replies: ReplyService::new(
                replies.clone(),
                posts.clone(),
                avatars,
                options.recent_limit,
            ),
            moderation: ModerationService::new(posts, replies, log),
        }
    }
}

//! Shared fixtures: a fully wired [`Forum`] over the in-memory store.

use std::sync::Arc;

use domains::{Category, ForumUser, NewCategory, Post, Result, Role, VisibilityTier};
use services::{Forum, ForumOptions, PostDraft};
use storage_adapters::{MemoryForumStore, PathAvatarResolver};
use uuid::Uuid;

pub const AVATAR_PREFIX: &str = "/media/avatars";

pub struct TestForum {
    pub store: Arc<MemoryForumStore>,
    pub forum: Forum,
}

impl TestForum {
    pub fn new() -> Self {
        let store = Arc::new(MemoryForumStore::new());
        let forum = Forum::new(
            store.clone(),
            Arc::new(PathAvatarResolver::new(AVATAR_PREFIX)),
            ForumOptions::default(),
        );
        Self { store, forum }
    }

    pub async fn category(&self, slug: &str, tier: VisibilityTier) -> Result<Category> {
        self.forum
            .categories
            .create(&admin(), NewCategory::new(slug, slug.replace('-', " "), tier))
            .await
    }

    pub async fn post(&self, author: &ForumUser, category_id: Uuid, title: &str) -> Result<Post> {
        self.forum
            .posts
            .create(
                author,
                PostDraft {
                    category_id,
                    title: title.to_owned(),
                    content: format!("{title} body"),
                },
            )
            .await
    }

    /// Current counters, bypassing access checks.
    pub async fn reload_category(&self, id: Uuid) -> Result<Category> {
        self.forum
            .categories
            .require_by_id(Some(&admin()), id)
            .await
    }
}

impl Default for TestForum {
    fn default() -> Self {
        Self::new()
    }
}

pub fn admin() -> ForumUser {
    user(Role::Admin)
}

pub fn user(role: Role) -> ForumUser {
    ForumUser::new(Uuid::now_v7(), role)
}

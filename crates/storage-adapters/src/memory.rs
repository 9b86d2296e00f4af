//! # In-memory store
//!
//! Implements every forum port over a single `RwLock`ed state. Each mutating
//! call validates first and then applies all of its row changes under one
//! write guard, which gives the same all-or-nothing visibility as a database
//! transaction. Author profiles live in a separate `DashMap` because they
//! belong to the host application and are never written by the forum.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{
    AuthorProfile, AuthorSummary, Category, CategoryPatch, CategoryRepository, CategorySummary,
    DomainError, ModerationEvent, ModerationLog, NewCategory, NewModerationEvent, NewPost,
    NewReply, Post, PostDetail, PostPatch, PostRepository, RecentReply, Reply, ReplyDetail,
    ReplyRepository, Result, TierSet, ViewerScope,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct ForumState {
    categories: HashMap<Uuid, Category>,
    posts: HashMap<Uuid, Post>,
    replies: HashMap<Uuid, Reply>,
    events: Vec<ModerationEvent>,
}

impl ForumState {
    fn in_scope(&self, category_id: Uuid, scope: &ViewerScope) -> bool {
        self.categories
            .get(&category_id)
            .is_some_and(|c| scope.admits(c.access_level, c.is_active))
    }
}

#[derive(Default)]
pub struct MemoryForumStore {
    state: RwLock<ForumState>,
    authors: DashMap<Uuid, AuthorProfile>,
}

impl MemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a host user profile used for author summaries.
    pub fn upsert_author(&self, profile: AuthorProfile) {
        self.authors.insert(profile.user_id, profile);
    }

    /// Audit trail in append order.
    pub async fn moderation_events(&self) -> Vec<ModerationEvent> {
        self.state.read().await.events.clone()
    }

    fn author(&self, user_id: Uuid) -> AuthorSummary {
        self.authors
            .get(&user_id)
            .map(|profile| AuthorSummary::from(profile.value()))
            .unwrap_or_else(|| AuthorSummary::unknown(user_id))
    }
}

/// Pinned first, then threads without replies, then most recent activity,
/// then newest. `None` timestamps sort last.
pub fn thread_order(a: &Post, b: &Post) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| (b.reply_count == 0).cmp(&(a.reply_count == 0)))
        .then_with(|| b.last_reply_at.cmp(&a.last_reply_at))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Every whitespace-separated term must occur; title hits weigh double.
fn relevance(post: &Post, terms: &[String]) -> Option<usize> {
    let title = post.title.to_lowercase();
    let content = post.content.to_lowercase();
    let mut score = 0;
    for term in terms {
        let hits =
            title.matches(term.as_str()).count() * 2 + content.matches(term.as_str()).count();
        if hits == 0 {
            return None;
        }
        score += hits;
    }
    Some(score)
}

fn limit_to_usize(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl CategoryRepository for MemoryForumStore {
    async fn list_active(&self, tiers: &TierSet) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state
            .categories
            .values()
            .filter(|c| c.is_active && tiers.contains(&c.access_level))
            .cloned()
            .collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn create(&self, category: NewCategory) -> Result<Category> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.slug == category.slug) {
            return Err(DomainError::validation(format!(
                "category slug '{}' already exists",
                category.slug
            )));
        }

        let now = Utc::now();
        let row = Category {
            id: Uuid::now_v7(),
            slug: category.slug,
            name: category.name,
            description: category.description,
            access_level: category.access_level,
            is_active: category.is_active,
            sort_order: category.sort_order,
            thread_count: 0,
            post_count: 0,
            last_post_at: None,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>> {
        let mut state = self.state.write().await;
        if let Some(slug) = &patch.slug {
            if state.categories.values().any(|c| c.id != id && &c.slug == slug) {
                return Err(DomainError::validation(format!(
                    "category slug '{slug}' already exists"
                )));
            }
        }

        let Some(category) = state.categories.get_mut(&id) else {
            return Ok(None);
        };
        if !patch.is_empty() {
            patch.apply_to(category);
            category.updated_at = Utc::now();
        }
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Ok(false);
        }
        state.posts.retain(|_, p| p.category_id != id);
        let ForumState { posts, replies, .. } = &mut *state;
        replies.retain(|_, r| posts.contains_key(&r.post_id));
        Ok(true)
    }
}

#[async_trait]
impl PostRepository for MemoryForumStore {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        posts.sort_by(thread_order);
        Ok(posts)
    }

    async fn search(&self, term: &str, tiers: &TierSet, limit: i64) -> Result<Vec<Post>> {
        let terms: Vec<String> = term.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        let mut hits: Vec<(usize, &Post)> = state
            .posts
            .values()
            .filter(|p| {
                state
                    .categories
                    .get(&p.category_id)
                    .is_some_and(|c| c.is_active && tiers.contains(&c.access_level))
            })
            .filter_map(|p| relevance(p, &terms).map(|score| (score, p)))
            .collect();
        hits.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| b.updated_at.cmp(&a.updated_at)));
        debug!(term, hits = hits.len(), "memory search");

        Ok(hits
            .into_iter()
            .take(limit_to_usize(limit))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn list_recent_by_user(
        &self,
        user_id: Uuid,
        scope: &ViewerScope,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.user_id == user_id && state.in_scope(p.category_id, scope))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        posts.truncate(limit_to_usize(limit));
        Ok(posts)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PostDetail>> {
        let state = self.state.read().await;
        let Some(post) = state.posts.get(&id) else {
            return Ok(None);
        };
        let Some(category) = state.categories.get(&post.category_id) else {
            return Ok(None);
        };
        Ok(Some(PostDetail {
            post: post.clone(),
            category: CategorySummary::from(category),
            author: self.author(post.user_id),
        }))
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<()> {
        if let Some(post) = self.state.write().await.posts.get_mut(&id) {
            post.view_count += 1;
        }
        Ok(())
    }

    async fn create(&self, post: NewPost) -> Result<Post> {
        let mut state = self.state.write().await;
        let Some(category) = state.categories.get_mut(&post.category_id) else {
            return Err(DomainError::validation(format!(
                "category {} does not exist",
                post.category_id
            )));
        };

        let now = Utc::now();
        category.thread_count += 1;
        category.post_count += 1;
        category.last_post_at = Some(now);

        let row = Post {
            id: Uuid::now_v7(),
            category_id: post.category_id,
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            pinned: false,
            locked: false,
            view_count: 0,
            reply_count: 0,
            last_reply_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        if !patch.is_empty() {
            patch.apply_to(post);
            post.updated_at = Utc::now();
        }
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(post) = state.posts.remove(&id) else {
            return Ok(false);
        };
        state.replies.retain(|_, r| r.post_id != id);
        if let Some(category) = state.categories.get_mut(&post.category_id) {
            category.thread_count = (category.thread_count - 1).max(0);
            category.post_count = (category.post_count - (post.reply_count + 1)).max(0);
        }
        Ok(true)
    }
}

#[async_trait]
impl ReplyRepository for MemoryForumStore {
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<ReplyDetail>> {
        let state = self.state.read().await;
        let mut replies: Vec<&Reply> = state
            .replies
            .values()
            .filter(|r| r.post_id == post_id)
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(replies
            .into_iter()
            .map(|r| ReplyDetail {
                reply: r.clone(),
                author: self.author(r.user_id),
            })
            .collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReplyDetail>> {
        let state = self.state.read().await;
        Ok(state.replies.get(&id).map(|r| ReplyDetail {
            reply: r.clone(),
            author: self.author(r.user_id),
        }))
    }

    async fn list_recent_by_user(
        &self,
        user_id: Uuid,
        scope: &ViewerScope,
        limit: i64,
    ) -> Result<Vec<RecentReply>> {
        let state = self.state.read().await;
        let mut replies: Vec<RecentReply> = state
            .replies
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let post = state.posts.get(&r.post_id)?;
                state.in_scope(post.category_id, scope).then(|| RecentReply {
                    reply: r.clone(),
                    post_title: post.title.clone(),
                    category_id: post.category_id,
                })
            })
            .collect();
        replies.sort_by(|a, b| {
            b.reply
                .created_at
                .cmp(&a.reply.created_at)
                .then_with(|| b.reply.id.cmp(&a.reply.id))
        });
        replies.truncate(limit_to_usize(limit));
        Ok(replies)
    }

    async fn create(&self, reply: NewReply) -> Result<Reply> {
        let mut state = self.state.write().await;
        let Some(category_id) = state.posts.get(&reply.post_id).map(|p| p.category_id) else {
            return Err(DomainError::validation(format!(
                "post {} does not exist",
                reply.post_id
            )));
        };
        if let Some(parent_id) = reply.parent_id {
            let same_thread = state
                .replies
                .get(&parent_id)
                .is_some_and(|parent| parent.post_id == reply.post_id);
            if !same_thread {
                return Err(DomainError::validation(format!(
                    "parent reply {parent_id} does not belong to post {}",
                    reply.post_id
                )));
            }
        }

        let now = Utc::now();
        let row = Reply {
            id: Uuid::now_v7(),
            post_id: reply.post_id,
            parent_id: reply.parent_id,
            user_id: reply.user_id,
            content: reply.content,
            created_at: now,
            updated_at: now,
        };
        state.replies.insert(row.id, row.clone());
        if let Some(post) = state.posts.get_mut(&row.post_id) {
            post.reply_count += 1;
            post.last_reply_at = Some(now);
        }
        if let Some(category) = state.categories.get_mut(&category_id) {
            category.post_count += 1;
            category.last_post_at = Some(now);
        }
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(reply) = state.replies.remove(&id) else {
            return Ok(false);
        };
        let category_id = state.posts.get_mut(&reply.post_id).map(|post| {
            post.reply_count = (post.reply_count - 1).max(0);
            post.category_id
        });
        if let Some(category) = category_id.and_then(|cid| state.categories.get_mut(&cid)) {
            category.post_count = (category.post_count - 1).max(0);
        }
        Ok(true)
    }
}

#[async_trait]
impl ModerationLog for MemoryForumStore {
    async fn record_event(&self, event: NewModerationEvent) -> Result<ModerationEvent> {
        let row = ModerationEvent {
            id: Uuid::now_v7(),
            post_id: event.post_id,
            performed_by: event.performed_by,
            action: event.action,
            metadata: event.metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: Utc::now(),
        };
        self.state.write().await.events.push(row.clone());
        Ok(row)
    }
}

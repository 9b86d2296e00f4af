//! # Category Service
//!
//! Visibility-filtered reads plus admin-only category management. Counters
//! are never touched here; only post and reply mutations move them.

use std::sync::Arc;

use domains::{
    Category, CategoryPatch, CategoryRepository, DomainError, ForumUser, NewCategory, Result,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::access::{accessible_tiers, require_admin, require_visible_category};
use crate::validation::{require_text, validate_slug};

#[derive(Clone)]
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Active categories the viewer may see, by `sort_order` then `name`.
    #[instrument(skip(self, user), fields(user_id = ?user.map(|u| u.id)))]
    pub async fn list(&self, user: Option<&ForumUser>) -> Result<Vec<Category>> {
        let tiers = accessible_tiers(user);
        let categories = self.repo.list_active(&tiers).await?;
        debug!(count = categories.len(), "listed categories");
        Ok(categories)
    }

    /// Unfiltered lookup for admin tooling.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.repo.get_by_slug(slug).await
    }

    /// Unfiltered lookup for admin tooling.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        self.repo.get_by_id(id).await
    }

    /// Lookup on behalf of a viewer. Inactive categories are hidden from
    /// everyone but admins.
    pub async fn require_by_slug(&self, user: Option<&ForumUser>, slug: &str) -> Result<Category> {
        let category = self
            .repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", slug))?;
        ensure_visible(user, &category)?;
        Ok(category)
    }

    /// Lookup by id on behalf of a viewer.
    pub async fn require_by_id(&self, user: Option<&ForumUser>, id: Uuid) -> Result<Category> {
        let category = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))?;
        ensure_visible(user, &category)?;
        Ok(category)
    }

    #[instrument(skip(self, actor, payload), fields(slug = %payload.slug))]
    pub async fn create(&self, actor: &ForumUser, payload: NewCategory) -> Result<Category> {
        require_admin(actor, "create categories")?;
        validate_slug(&payload.slug)?;
        require_text("name", &payload.name, None)?;

        let category = self.repo.create(payload).await?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, actor, patch))]
    pub async fn update(
        &self,
        actor: &ForumUser,
        id: Uuid,
        patch: CategoryPatch,
    ) -> Result<Category> {
        require_admin(actor, "edit categories")?;
        if let Some(slug) = &patch.slug {
            validate_slug(slug)?;
        }
        if let Some(name) = &patch.name {
            require_text("name", name, None)?;
        }

        self.repo
            .update(id, patch)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }

    /// Removes the category with all of its threads. Missing ids are a no-op.
    #[instrument(skip(self, actor))]
    pub async fn delete(&self, actor: &ForumUser, id: Uuid) -> Result<()> {
        require_admin(actor, "delete categories")?;
        if self.repo.delete(id).await? {
            info!(category_id = %id, "category deleted");
        }
        Ok(())
    }
}

pub(crate) fn ensure_visible(user: Option<&ForumUser>, category: &Category) -> Result<()> {
    require_visible_category(user, category.id, category.access_level, category.is_active)
}

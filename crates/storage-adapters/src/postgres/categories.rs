use async_trait::async_trait;
use chrono::Utc;
use domains::{Category, CategoryPatch, CategoryRepository, NewCategory, Result, TierSet};
use uuid::Uuid;

use super::rows::CategoryRow;
use super::{map_sqlx, PgForumStore};

const CATEGORY_COLUMNS: &str = "id, slug, name, description, access_level, is_active, sort_order, \
     thread_count, post_count, last_post_at, created_at, updated_at";

#[async_trait]
impl CategoryRepository for PgForumStore {
    async fn list_active(&self, tiers: &TierSet) -> Result<Vec<Category>> {
        self.ensure_schema().await?;
        let labels: Vec<String> = tiers.iter().map(|t| t.as_str().to_owned()).collect();
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM forum_categories
             WHERE is_active AND access_level = ANY($1)
             ORDER BY sort_order ASC, name ASC"
        );
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(labels)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        self.ensure_schema().await?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM forum_categories WHERE slug = $1");
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(Category::try_from)
            .transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        self.ensure_schema().await?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM forum_categories WHERE id = $1");
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(Category::try_from)
            .transpose()
    }

    async fn create(&self, category: NewCategory) -> Result<Category> {
        self.ensure_schema().await?;
        let sql = format!(
            "INSERT INTO forum_categories
                 (id, slug, name, description, access_level, is_active, sort_order,
                  created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(&category.slug)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.access_level.as_str())
            .bind(category.is_active)
            .bind(category.sort_order)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?
            .try_into()
    }

    async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Option<Category>> {
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }
        self.ensure_schema().await?;
        let sql = format!(
            "UPDATE forum_categories SET
                 slug         = COALESCE($2, slug),
                 name         = COALESCE($3, name),
                 description  = COALESCE($4, description),
                 access_level = COALESCE($5, access_level),
                 is_active    = COALESCE($6, is_active),
                 sort_order   = COALESCE($7, sort_order),
                 updated_at   = $8
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id)
            .bind(patch.slug)
            .bind(patch.name)
            .bind(patch.description)
            .bind(patch.access_level.map(|t| t.as_str()))
            .bind(patch.is_active)
            .bind(patch.sort_order)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(Category::try_from)
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.ensure_schema().await?;
        // posts and replies go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM forum_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use domains::{NewPost, Post, PostDetail, PostPatch, PostRepository, Result, TierSet, ViewerScope};
use tracing::debug;
use uuid::Uuid;

use super::rows::{PostDetailRow, PostRow};
use super::{limit_or_zero, map_sqlx, tier_labels, PgForumStore};

const POST_COLUMNS: &str = "p.id, p.category_id, p.user_id, p.title, p.content, \
     p.pinned, p.locked, p.view_count, p.reply_count, p.last_reply_at, \
     p.created_at, p.updated_at";

#[async_trait]
impl PostRepository for PgForumStore {
    async fn list_by_category(&self, category_id: Uuid) -> Result<Vec<Post>> {
        self.ensure_schema().await?;
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM forum_posts p
             WHERE p.category_id = $1
             ORDER BY p.pinned DESC,
                      (p.reply_count = 0) DESC,
                      p.last_reply_at DESC NULLS LAST,
                      p.created_at DESC"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn search(&self, term: &str, tiers: &TierSet, limit: i64) -> Result<Vec<Post>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_schema().await?;

        let sql = format!(
            "SELECT {POST_COLUMNS},
                    ts_rank(to_tsvector('english', p.title || ' ' || p.content),
                            plainto_tsquery('english', $1)) AS rank
             FROM forum_posts p
             JOIN forum_categories c ON c.id = p.category_id
             WHERE c.is_active
               AND c.access_level = ANY($2)
               AND to_tsvector('english', p.title || ' ' || p.content)
                   @@ plainto_tsquery('english', $1)
             ORDER BY rank DESC, p.updated_at DESC
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(term)
            .bind(tier_labels(tiers))
            .bind(limit_or_zero(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        debug!(hits = rows.len(), "full-text search");
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn list_recent_by_user(
        &self,
        user_id: Uuid,
        scope: &ViewerScope,
        limit: i64,
    ) -> Result<Vec<Post>> {
        self.ensure_schema().await?;
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM forum_posts p
             JOIN forum_categories c ON c.id = p.category_id
             WHERE p.user_id = $1
               AND c.access_level = ANY($2)
               AND (c.is_active OR $3)
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $4"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(user_id)
            .bind(tier_labels(&scope.tiers))
            .bind(scope.include_inactive)
            .bind(limit_or_zero(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<PostDetail>> {
        self.ensure_schema().await?;
        let sql = format!(
            "SELECT {POST_COLUMNS},
                    c.slug AS category_slug,
                    c.name AS category_name,
                    c.access_level AS category_access_level,
                    c.is_active AS category_is_active,
                    u.name AS author_name,
                    u.display_name AS author_display_name,
                    u.role AS author_role,
                    u.forum_signature AS author_signature
             FROM forum_posts p
             JOIN forum_categories c ON c.id = p.category_id
             LEFT JOIN users u ON u.id = p.user_id
             WHERE p.id = $1"
        );
        sqlx::query_as::<_, PostDetailRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(PostDetail::try_from)
            .transpose()
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<()> {
        self.ensure_schema().await?;
        sqlx::query("UPDATE forum_posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn create(&self, post: NewPost) -> Result<Post> {
        self.ensure_schema().await?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let sql = format!(
            "INSERT INTO forum_posts AS p
                 (id, category_id, user_id, title, content, last_reply_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6, $6)
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(post.category_id)
            .bind(post.user_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE forum_categories
             SET thread_count = thread_count + 1,
                 post_count   = post_count + 1,
                 last_post_at = $2
             WHERE id = $1",
        )
        .bind(post.category_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<Option<Post>> {
        self.ensure_schema().await?;
        if patch.is_empty() {
            let sql = format!("SELECT {POST_COLUMNS} FROM forum_posts p WHERE p.id = $1");
            let row = sqlx::query_as::<_, PostRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
            return Ok(row.map(Post::from));
        }

        let sql = format!(
            "UPDATE forum_posts AS p SET
                 title      = COALESCE($2, p.title),
                 content    = COALESCE($3, p.content),
                 pinned     = COALESCE($4, p.pinned),
                 locked     = COALESCE($5, p.locked),
                 updated_at = $6
             WHERE p.id = $1
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(patch.title)
            .bind(patch.content)
            .bind(patch.pinned)
            .bind(patch.locked)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Post::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let target: Option<(Uuid, i64)> = sqlx::query_as(
            "SELECT category_id, reply_count FROM forum_posts WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        let Some((category_id, reply_count)) = target else {
            return Ok(false);
        };

        // replies go with it through ON DELETE CASCADE
        sqlx::query("DELETE FROM forum_posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE forum_categories
             SET thread_count = GREATEST(thread_count - 1, 0),
                 post_count   = GREATEST(post_count - ($2 + 1), 0)
             WHERE id = $1",
        )
        .bind(category_id)
        .bind(reply_count)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(true)
    }
}

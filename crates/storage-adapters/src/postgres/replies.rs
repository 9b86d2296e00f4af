use async_trait::async_trait;
use chrono::Utc;
use domains::{
    DomainError, NewReply, RecentReply, Reply, ReplyDetail, ReplyRepository, Result, ViewerScope,
};
use uuid::Uuid;

use super::rows::{RecentReplyRow, ReplyDetailRow, ReplyRow};
use super::{limit_or_zero, map_sqlx, tier_labels, PgForumStore};

const REPLY_COLUMNS: &str =
    "r.id, r.post_id, r.parent_id, r.user_id, r.content, r.created_at, r.updated_at";

const AUTHOR_COLUMNS: &str = "u.name AS author_name, u.display_name AS author_display_name, \
     u.role AS author_role, u.forum_signature AS author_signature";

#[async_trait]
impl ReplyRepository for PgForumStore {
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<ReplyDetail>> {
        self.ensure_schema().await?;
        let sql = format!(
            "SELECT {REPLY_COLUMNS}, {AUTHOR_COLUMNS}
             FROM forum_replies r
             LEFT JOIN users u ON u.id = r.user_id
             WHERE r.post_id = $1
             ORDER BY r.created_at ASC, r.id ASC"
        );
        let rows = sqlx::query_as::<_, ReplyDetailRow>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(ReplyDetail::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReplyDetail>> {
        self.ensure_schema().await?;
        let sql = format!(
            "SELECT {REPLY_COLUMNS}, {AUTHOR_COLUMNS}
             FROM forum_replies r
             LEFT JOIN users u ON u.id = r.user_id
             WHERE r.id = $1"
        );
        let row = sqlx::query_as::<_, ReplyDetailRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(ReplyDetail::from))
    }

    async fn list_recent_by_user(
        &self,
        user_id: Uuid,
        scope: &ViewerScope,
        limit: i64,
    ) -> Result<Vec<RecentReply>> {
        self.ensure_schema().await?;
        let sql = format!(
            "SELECT {REPLY_COLUMNS}, p.title AS post_title, p.category_id
             FROM forum_replies r
             JOIN forum_posts p ON p.id = r.post_id
             JOIN forum_categories c ON c.id = p.category_id
             WHERE r.user_id = $1
               AND c.access_level = ANY($2)
               AND (c.is_active OR $3)
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT $4"
        );
        let rows = sqlx::query_as::<_, RecentReplyRow>(&sql)
            .bind(user_id)
            .bind(tier_labels(&scope.tiers))
            .bind(scope.include_inactive)
            .bind(limit_or_zero(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(RecentReply::from).collect())
    }

    async fn create(&self, reply: NewReply) -> Result<Reply> {
        self.ensure_schema().await?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // row lock serialises concurrent replies on the same thread
        let category_id: Option<Uuid> =
            sqlx::query_scalar("SELECT category_id FROM forum_posts WHERE id = $1 FOR UPDATE")
                .bind(reply.post_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx)?;
        let Some(category_id) = category_id else {
            return Err(DomainError::validation(format!(
                "post {} does not exist",
                reply.post_id
            )));
        };

        if let Some(parent_id) = reply.parent_id {
            let parent_post: Option<Uuid> =
                sqlx::query_scalar("SELECT post_id FROM forum_replies WHERE id = $1")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx)?;
            if parent_post != Some(reply.post_id) {
                return Err(DomainError::validation(format!(
                    "parent reply {parent_id} does not belong to post {}",
                    reply.post_id
                )));
            }
        }

        let sql = format!(
            "INSERT INTO forum_replies AS r
                 (id, post_id, parent_id, user_id, content, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {REPLY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(reply.post_id)
            .bind(reply.parent_id)
            .bind(reply.user_id)
            .bind(&reply.content)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE forum_posts
             SET reply_count = reply_count + 1, last_reply_at = $2
             WHERE id = $1",
        )
        .bind(reply.post_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE forum_categories
             SET post_count = post_count + 1, last_post_at = $2
             WHERE id = $1",
        )
        .bind(category_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let target: Option<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT r.post_id, p.category_id
             FROM forum_replies r
             JOIN forum_posts p ON p.id = r.post_id
             WHERE r.id = $1
             FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        let Some((post_id, category_id)) = target else {
            return Ok(false);
        };

        // children keep their parent_id; no cascade
        sqlx::query("DELETE FROM forum_replies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE forum_posts SET reply_count = GREATEST(reply_count - 1, 0) WHERE id = $1",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query(
            "UPDATE forum_categories SET post_count = GREATEST(post_count - 1, 0) WHERE id = $1",
        )
        .bind(category_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(true)
    }
}

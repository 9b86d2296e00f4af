//! Row types mapping the Postgres schema onto domain models.

use chrono::{DateTime, Utc};
use domains::{
    AuthorSummary, Category, CategorySummary, DomainError, ModerationEvent, Post, PostDetail,
    RecentReply, Reply, ReplyDetail,
};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// A label the schema CHECKs should have rejected is a store fault, not a
/// caller fault.
fn decode<T: FromStr<Err = DomainError>>(label: &str) -> Result<T, DomainError> {
    label
        .parse()
        .map_err(|err: DomainError| DomainError::store(format!("corrupt row: {err}")))
}

#[derive(Debug, FromRow)]
pub(crate) struct CategoryRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub access_level: String,
    pub is_active: bool,
    pub sort_order: i32,
    pub thread_count: i64,
    pub post_count: i64,
    pub last_post_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = DomainError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            access_level: decode(&row.access_level)?,
            is_active: row.is_active,
            sort_order: row.sort_order,
            thread_count: row.thread_count,
            post_count: row.post_count,
            last_post_at: row.last_post_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PostRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub pinned: bool,
    pub locked: bool,
    pub view_count: i64,
    pub reply_count: i64,
    pub last_reply_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            category_id: row.category_id,
            user_id: row.user_id,
            title: row.title,
            content: row.content,
            pinned: row.pinned,
            locked: row.locked,
            view_count: row.view_count,
            reply_count: row.reply_count,
            last_reply_at: row.last_reply_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `LEFT JOIN users` columns; all null when the user row is gone.
#[derive(Debug, FromRow)]
pub(crate) struct AuthorColumns {
    pub author_name: Option<String>,
    pub author_display_name: Option<String>,
    pub author_role: Option<String>,
    pub author_signature: Option<String>,
}

impl AuthorColumns {
    fn into_summary(self, user_id: Uuid) -> AuthorSummary {
        AuthorSummary {
            user_id,
            name: self.author_name,
            display_name: self.author_display_name,
            role: self.author_role,
            signature: self.author_signature,
            avatar_url: None,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PostDetailRow {
    #[sqlx(flatten)]
    pub post: PostRow,
    pub category_slug: String,
    pub category_name: String,
    pub category_access_level: String,
    pub category_is_active: bool,
    #[sqlx(flatten)]
    pub author: AuthorColumns,
}

impl TryFrom<PostDetailRow> for PostDetail {
    type Error = DomainError;

    fn try_from(row: PostDetailRow) -> Result<Self, Self::Error> {
        let category = CategorySummary {
            id: row.post.category_id,
            slug: row.category_slug,
            name: row.category_name,
            access_level: decode(&row.category_access_level)?,
            is_active: row.category_is_active,
        };
        let author = row.author.into_summary(row.post.user_id);
        Ok(PostDetail {
            post: row.post.into(),
            category,
            author,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ReplyRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReplyRow> for Reply {
    fn from(row: ReplyRow) -> Self {
        Reply {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ReplyDetailRow {
    #[sqlx(flatten)]
    pub reply: ReplyRow,
    #[sqlx(flatten)]
    pub author: AuthorColumns,
}

impl From<ReplyDetailRow> for ReplyDetail {
    fn from(row: ReplyDetailRow) -> Self {
        let author = row.author.into_summary(row.reply.user_id);
        ReplyDetail {
            reply: row.reply.into(),
            author,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RecentReplyRow {
    #[sqlx(flatten)]
    pub reply: ReplyRow,
    pub post_title: String,
    pub category_id: Uuid,
}

impl From<RecentReplyRow> for RecentReply {
    fn from(row: RecentReplyRow) -> Self {
        RecentReply {
            reply: row.reply.into(),
            post_title: row.post_title,
            category_id: row.category_id,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ModerationEventRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub performed_by: Option<Uuid>,
    pub action: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ModerationEventRow> for ModerationEvent {
    type Error = DomainError;

    fn try_from(row: ModerationEventRow) -> Result<Self, Self::Error> {
        Ok(ModerationEvent {
            id: row.id,
            post_id: row.post_id,
            performed_by: row.performed_by,
            action: decode(&row.action)?,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

//! # Postgres store
//!
//! sqlx implementation of the forum ports. Multi-row mutations run inside a
//! single transaction; dropping an uncommitted `Transaction` rolls it back,
//! so an early `?` can never leave counters half-applied.

mod categories;
mod posts;
mod replies;
mod rows;

use async_trait::async_trait;
use chrono::Utc;
use domains::{
    DomainError, ModerationEvent, ModerationLog, NewModerationEvent, Result, TierSet,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};
use uuid::Uuid;

use rows::ModerationEventRow;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub struct PgForumStore {
    pool: PgPool,
    schema_ready: OnceCell<()>,
}

impl PgForumStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: OnceCell::new(),
        }
    }

    /// Opens a pool against `url`. Migrations run lazily on first use.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(map_sqlx)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations once per process. Safe to call
    /// redundantly; every public operation awaits it first.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                debug!("applying forum migrations");
                MIGRATOR.run(&self.pool).await.map_err(|err| {
                    error!(error = %err, "forum migrations failed");
                    DomainError::store(format!("schema bootstrap failed: {err}"))
                })?;
                info!("forum schema ready");
                Ok::<(), DomainError>(())
            })
            .await?;
        Ok(())
    }
}

/// Unique and foreign-key violations are caller mistakes; everything else is
/// an infrastructure failure passed through unchanged.
pub(crate) fn tier_labels(tiers: &TierSet) -> Vec<String> {
    tiers.iter().map(|t| t.as_str().to_owned()).collect()
}

pub(crate) fn map_sqlx(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DomainError::validation(format!("duplicate value: {}", db.message()));
        }
        if db.is_foreign_key_violation() {
            return DomainError::validation(format!(
                "referenced row does not exist: {}",
                db.message()
            ));
        }
    }
    error!(error = %err, "database error");
    DomainError::store(err.to_string())
}

pub(crate) fn limit_or_zero(limit: i64) -> i64 {
    limit.max(0)
}

#[async_trait]
impl ModerationLog for PgForumStore {
    async fn record_event(&self, event: NewModerationEvent) -> Result<ModerationEvent> {
        self.ensure_schema().await?;
        let metadata = event.metadata.unwrap_or_else(|| serde_json::json!({}));
        let row = sqlx::query_as::<_, ModerationEventRow>(
            "INSERT INTO forum_moderation_events
                 (id, post_id, performed_by, action, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, post_id, performed_by, action, metadata, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(event.post_id)
        .bind(event.performed_by)
        .bind(event.action.as_str())
        .bind(metadata)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.try_into()
    }
}

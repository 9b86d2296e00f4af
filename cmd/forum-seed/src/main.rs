//! # forum-seed
//!
//! Applies the forum schema and creates the default categories. Safe to run
//! repeatedly: categories whose slug already exists are left alone.

use std::sync::Arc;

use anyhow::Context;
use configs::{LogSettings, Settings};
use domains::{ForumUser, NewCategory, Role, VisibilityTier};
use secrecy::ExposeSecret;
use services::{Forum, ForumOptions};
use storage_adapters::{PathAvatarResolver, PgForumStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// `(slug, name, description, tier)` in display order.
const DEFAULT_CATEGORIES: [(&str, &str, &str, VisibilityTier); 5] = [
    (
        "announcements",
        "Announcements",
        "News and updates from the team",
        VisibilityTier::Public,
    ),
    (
        "general",
        "General Discussion",
        "Anything goes, within the rules",
        VisibilityTier::Public,
    ),
    (
        "actors-lounge",
        "Actors' Lounge",
        "Auditions, craft and life on set",
        VisibilityTier::Actor,
    ),
    (
        "industry-professionals",
        "Industry Professionals",
        "Verified agents and casting directors",
        VisibilityTier::Professional,
    ),
    (
        "vip-lounge",
        "VIP Lounge",
        "Investors and administrators",
        VisibilityTier::Vip,
    ),
];

fn init_tracing(logging: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.logging);

    let store = PgForumStore::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("connecting to the database")?;
    store.ensure_schema().await.context("applying migrations")?;
    info!("schema is up to date");

    let forum = Forum::new(
        Arc::new(store),
        Arc::new(PathAvatarResolver::new(settings.forum.avatar_base_url.clone())),
        ForumOptions {
            search_limit: settings.forum.search_limit,
            recent_limit: settings.forum.recent_limit,
        },
    );

    // Seeding runs outside any user session.
    let system = ForumUser::new(Uuid::nil(), Role::Admin);
    let mut created = 0;

    for (position, (slug, name, description, tier)) in DEFAULT_CATEGORIES.into_iter().enumerate() {
        if forum.categories.get_by_slug(slug).await?.is_some() {
            warn!(slug, "category already exists, skipping");
            continue;
        }
        let mut category = NewCategory::new(slug, name, tier);
        category.description = description.to_owned();
        category.sort_order = i32::try_from(position)?;

        forum
            .categories
            .create(&system, category)
            .await
            .with_context(|| format!("creating category {slug}"))?;
        info!(slug, tier = %tier, "category created");
        created += 1;
    }

    info!(created, "seeding finished");
    Ok(())
}

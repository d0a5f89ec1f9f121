//! Process startup shared by the server and seed binaries

use crate::config::Config;
use crate::middleware::rate_limit::{MemoryRateLimitStore, RateLimitStore, RedisRateLimitStore};
use std::sync::Arc;
use taskdesk_shared::db::{
    migrations::run_migrations,
    pool::{create_pool, DatabaseConfig},
};
use taskdesk_shared::seed::seed_demo_data;
use taskdesk_shared::store::{MemoryStore, PgStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Installs the global subscriber
///
/// `RUST_LOG` overrides `default_filter`. Output is JSON when `json` is set.
pub fn init_tracing(default_filter: &str, json: bool) {
    let fmt = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(fmt)
        .init();
}

/// Opens the configured store
///
/// `memory://` gives a fresh in-process store already holding the demo
/// account. Anything else is a PostgreSQL URL; pending migrations are applied.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if config.database.is_memory() {
        tracing::warn!("Using in-memory store, data is lost on shutdown");
        let store = MemoryStore::new();
        let summary = seed_demo_data(&store, false).await?;
        tracing::info!(
            email = %summary.user.email,
            tasks = summary.tasks_created,
            "Seeded demo account"
        );
        return Ok(Arc::new(store));
    }

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    Ok(Arc::new(PgStore::new(pool)))
}

/// Rate limit counters: Redis when `REDIS_URL` is set, else process memory
pub async fn rate_limit_counters(config: &Config) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    match &config.rate_limit.redis_url {
        Some(url) => {
            let store = RedisRateLimitStore::connect(url).await?;
            tracing::info!("Rate limit counters stored in Redis");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryRateLimitStore::new())),
    }
}

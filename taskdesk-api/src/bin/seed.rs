//! Loads the demo account and its sample tasks into PostgreSQL
//!
//! ```bash
//! DATABASE_URL=postgresql://... cargo run -p taskdesk-api --bin taskdesk-seed -- --reset
//! ```

use clap::Parser;
use taskdesk_api::bootstrap::init_tracing;
use taskdesk_shared::db::{
    migrations::{ensure_database_exists, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use taskdesk_shared::seed::{seed_demo_data, DEMO_EMAIL, DEMO_PASSWORD};
use taskdesk_shared::store::PgStore;

#[derive(Debug, Parser)]
#[command(name = "taskdesk-seed", version, about = "Seed the TaskDesk demo account")]
struct Args {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Delete the existing demo account and its tasks first
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_tracing("taskdesk_seed=info,taskdesk_shared=info", false);

    if args.database_url.starts_with("memory://") {
        anyhow::bail!("the in-memory store is seeded automatically at server start");
    }

    ensure_database_exists(&args.database_url).await?;
    let pool = create_pool(DatabaseConfig {
        url: args.database_url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let store = PgStore::new(pool);
    let summary = seed_demo_data(&store, args.reset).await?;

    if summary.user_created {
        tracing::info!(tasks = summary.tasks_created, "Demo data created");
    } else {
        tracing::info!("Demo account already exists, use --reset to recreate it");
    }
    tracing::info!("Login with {} / {}", DEMO_EMAIL, DEMO_PASSWORD);

    close_pool(store.pool()).await;
    Ok(())
}

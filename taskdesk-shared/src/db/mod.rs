/// PostgreSQL access: connection pooling and schema migrations
///
/// Record-level queries live on the models (`crate::models`); the
/// [`crate::store`] module puts a backend-neutral trait in front of them.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod pool;
pub mod migrations;

/// Persistence boundary for users and tasks
///
/// Handlers talk to a `dyn Store` instead of a `PgPool` so the API can run
/// against PostgreSQL in production and against [`MemoryStore`] in tests or
/// demo mode (`DATABASE_URL=memory://`).
///
/// # Example
///
/// ```
/// use taskdesk_shared::store::{MemoryStore, Store};
///
/// # async fn example() -> Result<(), taskdesk_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// assert_eq!(store.count_tasks().await?, 0);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::{CreateUser, User};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A task referenced a user that does not exist
    #[error("User not found")]
    UserNotFound,

    /// A unique constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backing database could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::UserNotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Data-access operations over users and tasks
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the backend answers
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Removes a user and, by cascade, their tasks
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;

    /// Tasks owned by `user_id`, newest first
    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Fails with [`StoreError::UserNotFound`] if the owner doesn't exist
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError>;

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError>;

    async fn toggle_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn count_tasks(&self) -> Result<i64, StoreError>;
}

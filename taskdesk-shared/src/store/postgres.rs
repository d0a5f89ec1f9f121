/// PostgreSQL-backed [`Store`]

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::db::pool::health_check;
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::{CreateUser, User};

/// Store that delegates to the model queries over a connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        Ok(User::count(&self.pool).await?)
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_user(&self.pool, user_id).await?)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        Ok(Task::update(&self.pool, id, data).await?)
    }

    async fn toggle_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::toggle_completed(&self.pool, id).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn count_tasks(&self) -> Result<i64, StoreError> {
        Ok(Task::count(&self.pool).await?)
    }
}

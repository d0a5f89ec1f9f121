/// In-process [`Store`] used by tests and demo mode
///
/// Mirrors the PostgreSQL behaviour that handlers depend on: case-insensitive
/// unique emails, the task owner foreign key, cascade on user delete, and
/// newest-first task listing. [`MemoryStore::set_available`] simulates an
/// outage.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    tasks: Vec<Task>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            available: AtomicBool::new(true),
        }
    }

    /// When false, every operation fails with [`StoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if state
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                data.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == email.to_lowercase())
            .cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        let removed = state.users.len() < before;

        if removed {
            state.tasks.retain(|t| t.user_id != id);
        }

        Ok(removed)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        self.check_available()?;
        Ok(self.state.read().await.users.len() as i64)
    }

    async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;

        // Reverse first so equal timestamps keep newest-inserted on top
        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(tasks)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        if !state.users.iter().any(|u| u.id == data.user_id) {
            return Err(StoreError::UserNotFound);
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            priority: data.priority,
            completed: false,
            due_date: data.due_date,
            user_id: data.user_id,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());

        Ok(task)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        Ok(state.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.apply(data, Utc::now());
            task.clone()
        }))
    }

    async fn toggle_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        Ok(state.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.completed = !task.completed;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;

        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        Ok(state.tasks.len() < before)
    }

    async fn count_tasks(&self) -> Result<i64, StoreError> {
        self.check_available()?;
        Ok(self.state.read().await.tasks.len() as i64)
    }
}

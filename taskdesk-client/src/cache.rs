/// Query/mutation cache over a [`TaskApi`]
///
/// Holds the last fetched task list. Reads are served from the cache while it
/// is fresh (five minutes by default). Mutations are optimistic: the cached
/// list is changed first, the request is sent, and on failure the previous
/// list is restored. Whatever the outcome, the list is then invalidated and
/// refetched so the cache converges on what the server holds.
///
/// ```text
/// mutate ─> snapshot + optimistic edit ─> API call ─┬─ ok ──> apply server copy ─┐
///                                                   └─ err ─> restore snapshot ──┴─> refetch
/// ```

use crate::api::TaskApi;
use crate::error::ClientResult;
use crate::form::{NewTask, TaskChanges};
use chrono::Utc;
use std::time::Duration;
use taskdesk_shared::models::task::TaskView;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// How long a fetched list is served without asking the server again
pub const STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Id prefix of optimistic tasks awaiting the server's copy
pub const TEMP_ID_PREFIX: &str = "temp-";

#[derive(Debug, Default)]
struct CacheState {
    tasks: Option<Vec<TaskView>>,
    fetched_at: Option<Instant>,
}

pub struct TaskCache<A> {
    api: A,
    state: RwLock<CacheState>,
    stale_time: Duration,
}

impl<A: TaskApi> TaskCache<A> {
    pub fn new(api: A) -> Self {
        Self::with_stale_time(api, STALE_TIME)
    }

    pub fn with_stale_time(api: A, stale_time: Duration) -> Self {
        Self {
            api,
            state: RwLock::new(CacheState::default()),
            stale_time,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Cached list without touching the network
    pub async fn snapshot(&self) -> Option<Vec<TaskView>> {
        self.state.read().await.tasks.clone()
    }

    pub async fn is_fresh(&self) -> bool {
        let state = self.state.read().await;
        match (state.tasks.as_ref(), state.fetched_at) {
            (Some(_), Some(at)) => at.elapsed() < self.stale_time,
            _ => false,
        }
    }

    /// Task list, from cache when fresh
    pub async fn tasks(&self) -> ClientResult<Vec<TaskView>> {
        if self.is_fresh().await {
            if let Some(tasks) = self.snapshot().await {
                return Ok(tasks);
            }
        }
        self.refetch().await
    }

    pub async fn refetch(&self) -> ClientResult<Vec<TaskView>> {
        let tasks = self.api.fetch_tasks().await?;

        let mut state = self.state.write().await;
        state.tasks = Some(tasks.clone());
        state.fetched_at = Some(Instant::now());

        Ok(tasks)
    }

    /// Marks the cached list stale; the next read goes to the server
    pub async fn invalidate(&self) {
        self.state.write().await.fetched_at = None;
    }

    pub async fn create(&self, task: NewTask) -> ClientResult<TaskView> {
        let temp_id = format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4());
        let optimistic = task.to_view(temp_id.clone(), Utc::now());

        let previous = self.optimistic(|tasks| tasks.insert(0, optimistic)).await;

        let result = self.api.create_task(task).await;
        match &result {
            Ok(created) => {
                let created = created.clone();
                self.edit(|tasks| {
                    if let Some(slot) = tasks.iter_mut().find(|t| t.id == temp_id) {
                        *slot = created;
                    }
                })
                .await;
            }
            Err(_) => self.rollback(previous).await,
        }

        self.settle().await;
        result
    }

    pub async fn update(&self, id: &str, changes: TaskChanges) -> ClientResult<TaskView> {
        let now = Utc::now();
        let previous = self
            .optimistic(|tasks| {
                if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                    changes.apply_to(task, now);
                }
            })
            .await;

        let result = self.api.update_task(id, changes).await;
        self.reconcile(&result, previous).await;
        result
    }

    pub async fn toggle(&self, id: &str) -> ClientResult<TaskView> {
        let previous = self
            .optimistic(|tasks| {
                if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                    task.completed = !task.completed;
                }
            })
            .await;

        let result = self.api.toggle_task(id).await;
        self.reconcile(&result, previous).await;
        result
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let previous = self.optimistic(|tasks| tasks.retain(|t| t.id != id)).await;

        let result = self.api.delete_task(id).await;
        if result.is_err() {
            self.rollback(previous).await;
        }
        self.settle().await;
        result
    }

    /// Applies `edit` to the cached list and returns the list as it was
    async fn optimistic<F>(&self, edit: F) -> Option<Vec<TaskView>>
    where
        F: FnOnce(&mut Vec<TaskView>),
    {
        let mut state = self.state.write().await;
        let previous = state.tasks.clone();
        if let Some(tasks) = state.tasks.as_mut() {
            edit(tasks);
        }
        previous
    }

    async fn edit<F>(&self, edit: F)
    where
        F: FnOnce(&mut Vec<TaskView>),
    {
        if let Some(tasks) = self.state.write().await.tasks.as_mut() {
            edit(tasks);
        }
    }

    async fn reconcile(&self, result: &ClientResult<TaskView>, previous: Option<Vec<TaskView>>) {
        match result {
            Ok(task) => {
                let task = task.clone();
                self.edit(|tasks| {
                    if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                        *slot = task;
                    }
                })
                .await;
            }
            Err(_) => self.rollback(previous).await,
        }
        self.settle().await;
    }

    async fn rollback(&self, previous: Option<Vec<TaskView>>) {
        tracing::debug!("Mutation failed, restoring cached task list");
        self.state.write().await.tasks = previous;
    }

    async fn settle(&self) {
        self.invalidate().await;
        if let Err(e) = self.refetch().await {
            tracing::warn!(error = %e, "Refetch after mutation failed");
        }
    }
}

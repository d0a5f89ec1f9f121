/// HTTP client for the TaskDesk API
///
/// [`ApiClient`] speaks the REST interface and keeps a backup of the task list
/// in [`LocalStorage`]. Every request carries the stored bearer token; a 401
/// clears the stored session and surfaces [`ClientError::SessionExpired`].
///
/// # Offline behaviour
///
/// When a request fails at the transport level (connection refused, DNS,
/// timeout) the task operations fall back to the local copy:
///
/// | Operation | Fallback |
/// |-----------|----------|
/// | fetch     | local list, or a single placeholder task when it is empty |
/// | create    | stored locally with a `local-<uuid>` id |
/// | update    | applied to the local copy, error if the id isn't there |
/// | delete    | removed from the local copy |
/// | toggle    | no fallback, the error is returned |
///
/// Errors the server actually answered with (validation, 403, 404, 500) are
/// returned as-is. Offline edits are not replayed against the server later.
///
/// # Example
///
/// ```no_run
/// use taskdesk_client::api::{ApiClient, TaskApi};
/// use taskdesk_client::config::ClientConfig;
/// use taskdesk_client::storage::LocalStorage;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = ClientConfig::from_env()?;
/// let client = ApiClient::new(&config, LocalStorage::open(&config.storage_path))?;
///
/// client.login("demo@taskmanager.com", "demo123").await?;
/// for task in client.fetch_tasks().await? {
///     println!("{} [{}]", task.title, task.priority.as_lowercase());
/// }
/// # Ok(())
/// # }
/// ```

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::form::{NewTask, TaskChanges};
use crate::storage::LocalStorage;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taskdesk_shared::models::priority::Priority;
use taskdesk_shared::models::task::TaskView;
use taskdesk_shared::models::user::{UserProfile, UserSummary};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Id prefix of tasks created while offline
pub const LOCAL_ID_PREFIX: &str = "local-";

pub const PLACEHOLDER_TITLE: &str = "Backend unavailable - Using sample data";
pub const PLACEHOLDER_DESCRIPTION: &str = "Connect the backend to manage your tasks";

/// Task operations the cache and the CLI depend on
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn fetch_tasks(&self) -> ClientResult<Vec<TaskView>>;

    async fn create_task(&self, task: NewTask) -> ClientResult<TaskView>;

    async fn update_task(&self, id: &str, changes: TaskChanges) -> ClientResult<TaskView>;

    async fn toggle_task(&self, id: &str) -> ClientResult<TaskView>;

    async fn delete_task(&self, id: &str) -> ClientResult<()>;
}

/// Shown when the backend is down and nothing was ever backed up
pub fn placeholder_task() -> TaskView {
    let now = Utc::now();
    TaskView {
        id: "default-1".to_string(),
        title: PLACEHOLDER_TITLE.to_string(),
        description: PLACEHOLDER_DESCRIPTION.to_string(),
        priority: Priority::Medium,
        completed: false,
        due_date: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: UserSummary,
}

/// `GET /health` payload
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub counts: Option<HealthCounts>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HealthCounts {
    pub tasks: i64,
    pub users: i64,
}

/// Whether a request should carry the stored session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Attach,
    Anonymous,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Mutex<LocalStorage>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, storage: LocalStorage) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            storage: Mutex::new(storage),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Currently stored user, if logged in
    pub async fn current_user(&self) -> Option<UserSummary> {
        let storage = self.storage.lock().await;
        storage.token()?;
        storage.user()
    }

    /// Exchanges credentials for a token and stores the session
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserSummary> {
        let request = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });

        let response = self.execute(request, Session::Anonymous).await?;
        let login: LoginResponse = decode(response).await?;

        self.storage
            .lock()
            .await
            .save_session(&login.token, &login.user)?;
        tracing::info!(email = %login.user.email, "Logged in");

        Ok(login.user)
    }

    /// Forgets the stored session; the server keeps no session state
    pub async fn logout(&self) -> ClientResult<()> {
        self.storage.lock().await.clear_session()?;
        Ok(())
    }

    /// Asks the server who the stored token belongs to
    pub async fn verify(&self) -> ClientResult<UserProfile> {
        self.data(self.http.get(self.url("/auth/verify")), Session::Attach)
            .await
    }

    pub async fn health(&self) -> ClientResult<Health> {
        let response = self
            .execute(self.http.get(self.url("/health")), Session::Anonymous)
            .await?;
        decode(response).await
    }

    /// True when `GET /health` answers with success
    pub async fn check_backend_connection(&self) -> bool {
        match self.health().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Backend connection check failed");
                false
            }
        }
    }

    async fn execute(&self, request: RequestBuilder, session: Session) -> ClientResult<Response> {
        let request = match session {
            Session::Attach => match self.storage.lock().await.token() {
                Some(token) => request.bearer_auth(token),
                None => request,
            },
            Session::Anonymous => request,
        };

        let response = request.send().await.map_err(ClientError::Network)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && session == Session::Attach {
            self.storage.lock().await.clear_session()?;
            tracing::info!("Session rejected by the API, stored credentials cleared");
            return Err(ClientError::SessionExpired);
        }

        let envelope = response.json::<ErrorEnvelope>().await.unwrap_or_default();
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
            code: envelope.code,
        })
    }

    async fn data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: Session,
    ) -> ClientResult<T> {
        let response = self.execute(request, session).await?;
        let envelope: DataEnvelope<T> = decode(response).await?;
        Ok(envelope.data)
    }

    /// Runs `edit` against the stored task list and writes it back
    async fn edit_local<R, F>(&self, edit: F) -> ClientResult<R>
    where
        F: FnOnce(&mut Vec<TaskView>) -> ClientResult<R> + Send,
        R: Send,
    {
        let mut storage = self.storage.lock().await;
        let mut tasks = storage.tasks();
        let out = edit(&mut tasks)?;
        storage.save_tasks(&tasks)?;
        Ok(out)
    }

    /// Mirrors a server-confirmed change into the backup copy
    async fn backup<F>(&self, edit: F)
    where
        F: FnOnce(&mut Vec<TaskView>) + Send,
    {
        let result = self
            .edit_local(|tasks| {
                edit(tasks);
                Ok(())
            })
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to update local task backup");
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

fn upsert(tasks: &mut Vec<TaskView>, task: TaskView) {
    match tasks.iter_mut().find(|t| t.id == task.id) {
        Some(existing) => *existing = task,
        None => tasks.insert(0, task),
    }
}

#[async_trait]
impl TaskApi for ApiClient {
    async fn fetch_tasks(&self) -> ClientResult<Vec<TaskView>> {
        match self
            .data::<Vec<TaskView>>(self.http.get(self.url("/tasks")), Session::Attach)
            .await
        {
            Ok(tasks) => {
                let backup = tasks.clone();
                self.backup(move |stored| *stored = backup).await;
                Ok(tasks)
            }
            Err(ClientError::Network(e)) => {
                tracing::warn!(error = %e, "Backend unavailable, reading tasks from local storage");
                let local = self.storage.lock().await.tasks();
                if local.is_empty() {
                    Ok(vec![placeholder_task()])
                } else {
                    Ok(local)
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn create_task(&self, task: NewTask) -> ClientResult<TaskView> {
        let request = self.http.post(self.url("/tasks")).json(&task);

        match self.data::<TaskView>(request, Session::Attach).await {
            Ok(created) => {
                let backup = created.clone();
                self.backup(move |stored| upsert(stored, backup)).await;
                Ok(created)
            }
            Err(ClientError::Network(e)) => {
                tracing::warn!(error = %e, "Backend unavailable, creating task locally");
                let local = task.to_view(format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()), Utc::now());
                let out = local.clone();
                self.edit_local(move |stored| {
                    stored.insert(0, local);
                    Ok(())
                })
                .await?;
                Ok(out)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_task(&self, id: &str, changes: TaskChanges) -> ClientResult<TaskView> {
        let request = self
            .http
            .put(self.url(&format!("/tasks/{}", id)))
            .json(&changes);

        match self.data::<TaskView>(request, Session::Attach).await {
            Ok(updated) => {
                let backup = updated.clone();
                self.backup(move |stored| upsert(stored, backup)).await;
                Ok(updated)
            }
            Err(ClientError::Network(e)) => {
                tracing::warn!(error = %e, task_id = %id, "Backend unavailable, updating task locally");
                let id = id.to_string();
                self.edit_local(move |stored| {
                    let task = stored
                        .iter_mut()
                        .find(|t| t.id == id)
                        .ok_or(ClientError::LocalTaskNotFound)?;
                    changes.apply_to(task, Utc::now());
                    Ok(task.clone())
                })
                .await
            }
            Err(e) => Err(e),
        }
    }

    async fn toggle_task(&self, id: &str) -> ClientResult<TaskView> {
        let request = self.http.patch(self.url(&format!("/tasks/{}/toggle", id)));

        let toggled = self.data::<TaskView>(request, Session::Attach).await?;
        let backup = toggled.clone();
        self.backup(move |stored| upsert(stored, backup)).await;
        Ok(toggled)
    }

    async fn delete_task(&self, id: &str) -> ClientResult<()> {
        let request = self.http.delete(self.url(&format!("/tasks/{}", id)));
        let owned_id = id.to_string();

        match self.execute(request, Session::Attach).await {
            Ok(_) => {
                self.backup(move |stored| stored.retain(|t| t.id != owned_id))
                    .await;
                Ok(())
            }
            Err(ClientError::Network(e)) => {
                tracing::warn!(error = %e, task_id = %id, "Backend unavailable, deleting task locally");
                self.edit_local(move |stored| {
                    stored.retain(|t| t.id != owned_id);
                    Ok(())
                })
                .await
            }
            Err(e) => Err(e),
        }
    }
}

/// Task model and database operations
///
/// Tasks are the core entity of TaskDesk: a to-do record owned by exactly one
/// user. Ownership is enforced by the API layer (see
/// [`crate::auth::authorization`]); queries here are plain CRUD.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH', 'URGENT');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(100) NOT NULL,
///     description TEXT,
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     due_date TIMESTAMPTZ,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Wire format
///
/// Clients never see [`Task`] directly. Handlers convert rows with
/// [`format_task_for_frontend`], which lowercases the priority, replaces a
/// missing description with `""` and renders timestamps as ISO-8601 strings.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::task::{Task, CreateTask, format_task_for_frontend};
/// use taskdesk_shared::models::priority::Priority;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     user_id,
///     title: "Write release notes".to_string(),
///     description: None,
///     priority: Priority::High,
///     due_date: None,
/// }).await?;
///
/// let view = format_task_for_frontend(&task);
/// assert_eq!(view.description, "");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::priority::Priority;

/// Maximum title length, in characters
pub const MAX_TITLE_LENGTH: usize = 100;

/// Task model representing a user's to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Title, trimmed and non-empty
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Normalized priority
    pub priority: Priority,

    /// Whether the task is done
    pub completed: bool,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Owning user
    pub user_id: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Owner of the new task
    pub user_id: Uuid,

    /// Title (already trimmed and validated)
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Normalized priority
    pub priority: Priority,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update of a task
///
/// `None` leaves a field untouched. For nullable columns, `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

const TASK_COLUMNS: &str =
    "id, title, description, priority, completed, due_date, user_id, created_at, updated_at";

impl Task {
    /// Creates a new, incomplete task
    ///
    /// # Errors
    ///
    /// Returns an error if the owning user does not exist (foreign key
    /// `tasks_user_id_fkey`) or the database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (title, description, priority, due_date, user_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.user_id)
            .fetch_one(pool)
            .await?;

        Ok(task)
    }

    /// Finds a task by ID, regardless of owner
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists a user's tasks, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
            TASK_COLUMNS
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Applies a partial update
    ///
    /// Only fields present in `data` are written; `updated_at` is always
    /// bumped. Returns `None` if the task doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", TASK_COLUMNS));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(completed) = data.completed {
            q = q.bind(completed);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Flips the completed flag in a single statement
    pub async fn toggle_completed(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET completed = NOT completed, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Deletes a task. Returns true if a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all tasks
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Applies a partial update in memory, mirroring [`Task::update`]
    pub fn apply(&mut self, changes: UpdateTask, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(completed) = changes.completed {
            self.completed = completed;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        self.updated_at = now;
    }
}

/// Task as exchanged with clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "iso_millis::option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

/// Converts a stored task into its client representation
pub fn format_task_for_frontend(task: &Task) -> TaskView {
    TaskView {
        id: task.id.to_string(),
        title: task.title.clone(),
        description: task.description.clone().unwrap_or_default(),
        priority: task.priority,
        completed: task.completed,
        due_date: task.due_date,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        format_task_for_frontend(task)
    }
}

/// Error for due dates that are neither RFC 3339 timestamps nor calendar dates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid due date: {0}")]
pub struct InvalidDueDate(pub String);

/// Parses a client-supplied due date
///
/// Accepts RFC 3339 timestamps (`2025-03-01T12:00:00.000Z`), `datetime-local`
/// values (`2025-03-01T12:00`, read as UTC) and plain dates (`2025-03-01`,
/// midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, InvalidDueDate> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(InvalidDueDate(raw.to_string()))
}

/// Deserializes a field that distinguishes "absent" from "null"
///
/// Use with `#[serde(default, deserialize_with = "present")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, `null` becomes `Some(None)`.
pub fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => serializer.serialize_str(&super::format(dt)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

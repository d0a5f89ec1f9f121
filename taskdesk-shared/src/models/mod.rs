/// Database models for TaskDesk
///
/// # Models
///
/// - `user`: accounts that own tasks and log in
/// - `task`: to-do items, plus their client wire format
/// - `priority`: the four priority levels and free-text normalization
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::user::User;
/// use taskdesk_shared::models::task::{Task, format_task_for_frontend};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(user) = User::find_by_email(&pool, "demo@taskmanager.com").await? {
///     for task in Task::list_by_user(&pool, user.id).await? {
///         println!("{}", serde_json::to_string(&format_task_for_frontend(&task)).unwrap());
///     }
/// }
/// # Ok(())
/// # }
/// ```

pub mod priority;
pub mod task;
pub mod user;

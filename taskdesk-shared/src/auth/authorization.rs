/// Ownership checks for task access
///
/// Every task belongs to exactly one user and only that user may view, modify
/// or delete it. Handlers look the task up first (so a missing id is reported
/// as not found) and then call [`require_task_owner`].
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::authorization::{require_ownership, TaskAction};
/// use uuid::Uuid;
///
/// let me = Uuid::new_v4();
/// assert!(require_ownership(me, me, TaskAction::View).is_ok());
///
/// let err = require_ownership(me, Uuid::new_v4(), TaskAction::Delete).unwrap_err();
/// assert_eq!(err.to_string(), "You do not have permission to delete this task");
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::task::Task;

/// What the caller is trying to do with a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    View,
    Modify,
    Delete,
}

impl TaskAction {
    pub fn verb(&self) -> &'static str {
        match self {
            TaskAction::View => "view",
            TaskAction::Modify => "modify",
            TaskAction::Delete => "delete",
        }
    }
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller does not own the resource
    #[error("You do not have permission to {} this task", .0.verb())]
    NotOwner(TaskAction),
}

/// Checks that `requester` owns a resource owned by `owner`
pub fn require_ownership(
    requester: Uuid,
    owner: Uuid,
    action: TaskAction,
) -> Result<(), AuthzError> {
    if requester != owner {
        return Err(AuthzError::NotOwner(action));
    }

    Ok(())
}

/// Checks that the authenticated user owns `task`
pub fn require_task_owner(
    auth: &AuthContext,
    task: &Task,
    action: TaskAction,
) -> Result<(), AuthzError> {
    let result = require_ownership(auth.user_id, task.user_id, action);

    if result.is_err() {
        tracing::warn!(
            user_id = %auth.user_id,
            task_id = %task.id,
            action = action.verb(),
            "Task access denied"
        );
    }

    result
}

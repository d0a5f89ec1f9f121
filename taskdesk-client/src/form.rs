/// Task form input and the payloads it produces
///
/// Forms hold raw text as typed by the user. `submit` validates it the same
/// way the API does (title required and at most 100 characters, description
/// at most 500) and produces the request payload, so obviously bad input never
/// leaves the machine.

use crate::error::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use taskdesk_shared::models::priority::{normalize_priority, Priority};
use taskdesk_shared::models::task::{iso_millis, parse_due_date, TaskView, MAX_TITLE_LENGTH};

pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Body of `POST /tasks`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_millis::option::serialize"
    )]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::Medium,
            due_date: None,
        }
    }

    /// Materializes the task locally, before or without the server
    pub fn to_view(&self, id: String, now: DateTime<Utc>) -> TaskView {
        TaskView {
            id,
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            priority: self.priority,
            completed: false,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /tasks/:id`
///
/// `None` leaves a field alone. On `description` and `due_date`, `Some(None)`
/// is sent as `null` and clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_due_change"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
    }

    /// Applies the changes to a local copy
    pub fn apply_to(&self, task: &mut TaskView, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone().unwrap_or_default();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        task.updated_at = now;
    }
}

fn serialize_due_change<S: Serializer>(
    value: &Option<Option<DateTime<Utc>>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(Some(dt)) => serializer.serialize_str(&iso_millis::format(dt)),
        _ => serializer.serialize_none(),
    }
}

/// Trims and checks a title
pub fn validate_title(raw: &str) -> ClientResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ClientError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ClientError::Validation(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

/// Trims and checks a description; blank means none
pub fn validate_description(raw: &str) -> ClientResult<Option<String>> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ClientError::Validation(format!(
            "Description cannot exceed {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok((!description.is_empty()).then(|| description.to_string()))
}

fn due_date(raw: &str) -> ClientResult<DateTime<Utc>> {
    parse_due_date(raw).map_err(|e| ClientError::Validation(e.to_string()))
}

/// The "new task" form
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

impl TaskForm {
    pub fn submit(&self) -> ClientResult<NewTask> {
        Ok(NewTask {
            title: validate_title(&self.title)?,
            description: match &self.description {
                Some(raw) => validate_description(raw)?,
                None => None,
            },
            priority: self
                .priority
                .as_deref()
                .map(normalize_priority)
                .unwrap_or_default(),
            due_date: self.due_date.as_deref().map(due_date).transpose()?,
        })
    }
}

/// The edit form: only the fields the user touched are sent
#[derive(Debug, Clone, Default)]
pub struct EditForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub clear_due_date: bool,
}

impl EditForm {
    pub fn submit(&self) -> ClientResult<TaskChanges> {
        if self.due_date.is_some() && self.clear_due_date {
            return Err(ClientError::Validation(
                "Choose either a new due date or clearing it".to_string(),
            ));
        }

        let changes = TaskChanges {
            title: self.title.as_deref().map(validate_title).transpose()?,
            description: self
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            priority: self.priority.as_deref().map(normalize_priority),
            completed: None,
            due_date: if self.clear_due_date {
                Some(None)
            } else {
                self.due_date.as_deref().map(due_date).transpose()?.map(Some)
            },
        };

        if changes.is_empty() {
            return Err(ClientError::Validation("Nothing to change".to_string()));
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_title_rules() {
        assert_eq!(validate_title("  Buy milk ").unwrap(), "Buy milk");
        assert_eq!(
            validate_title("   ").unwrap_err().to_string(),
            "Title is required"
        );
        assert_eq!(
            validate_title(&"x".repeat(101)).unwrap_err().to_string(),
            "Title cannot exceed 100 characters"
        );
        assert!(validate_title(&"ñ".repeat(100)).is_ok());
    }

    #[test]
    fn test_description_rules() {
        assert_eq!(validate_description("  ").unwrap(), None);
        assert_eq!(
            validate_description(&"d".repeat(501)).unwrap_err().to_string(),
            "Description cannot exceed 500 characters"
        );
    }

    #[test]
    fn test_task_form_normalizes() {
        let form = TaskForm {
            title: " Revisar PR ".to_string(),
            description: Some("".to_string()),
            priority: Some("alta".to_string()),
            due_date: Some("2025-03-01".to_string()),
        };

        let task = form.submit().unwrap();
        assert_eq!(task.title, "Revisar PR");
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(
            task.due_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_new_task_body() {
        let mut task = NewTask::new("Ship it");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Ship it", "priority": "medium"}));

        task.due_date = Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["dueDate"], "2025-03-01T12:00:00.000Z");
    }

    #[test]
    fn test_edit_form_clears_fields_with_null() {
        let form = EditForm {
            description: Some(String::new()),
            clear_due_date: true,
            ..Default::default()
        };

        let json = serde_json::to_value(form.submit().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"description": null, "dueDate": null})
        );
    }

    #[test]
    fn test_edit_form_rejects_nothing_and_conflicts() {
        assert!(EditForm::default().submit().is_err());
        assert!(EditForm {
            due_date: Some("2025-01-01".to_string()),
            clear_due_date: true,
            ..Default::default()
        }
        .submit()
        .is_err());
        assert!(EditForm {
            due_date: Some("someday".to_string()),
            ..Default::default()
        }
        .submit()
        .is_err());
    }

    #[test]
    fn test_apply_changes_locally() {
        let now = Utc::now();
        let mut task = NewTask {
            description: Some("old".to_string()),
            ..NewTask::new("T")
        }
        .to_view("local-1".to_string(), now);

        TaskChanges {
            description: Some(None),
            completed: Some(true),
            ..Default::default()
        }
        .apply_to(&mut task, now);

        assert_eq!(task.description, "");
        assert!(task.completed);
        assert_eq!(task.title, "T");
    }
}

/// Task priority levels and free-text normalization
///
/// Priorities are stored as the PostgreSQL enum `task_priority` using their
/// uppercase canonical names, and sent to clients lowercased.
///
/// Free-form input (from forms, older clients, or Spanish-language UIs) is
/// mapped onto the four levels through a fixed vocabulary. Anything outside the
/// vocabulary becomes [`Priority::Medium`].
///
/// # Example
///
/// ```
/// use taskdesk_shared::models::priority::{normalize_priority, Priority};
///
/// assert_eq!(normalize_priority("alta"), Priority::High);
/// assert_eq!(normalize_priority("URGENT"), Priority::Urgent);
/// assert_eq!(normalize_priority(""), Priority::Medium);
/// ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Vocabulary accepted by [`normalize_priority`], keyed by lowercase input
const PRIORITY_VOCABULARY: &[(&str, Priority)] = &[
    ("alta", Priority::High),
    ("media", Priority::Medium),
    ("baja", Priority::Low),
    ("urgente", Priority::Urgent),
    ("high", Priority::High),
    ("medium", Priority::Medium),
    ("low", Priority::Low),
    ("urgent", Priority::Urgent),
];

/// Maps free-text priority input onto a canonical level
///
/// Matching is case-insensitive against the bilingual vocabulary. The input is
/// not trimmed; unknown or empty input yields `Priority::Medium`.
pub fn normalize_priority(raw: &str) -> Priority {
    let lowered = raw.to_lowercase();

    PRIORITY_VOCABULARY
        .iter()
        .find(|(word, _)| *word == lowered)
        .map(|(_, priority)| *priority)
        .unwrap_or_default()
}

impl Priority {
    /// Canonical (uppercase) name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// Lowercase name, as sent to clients
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_lowercase())
    }
}

/// Deserialization is lenient and goes through [`normalize_priority`]
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(normalize_priority(&raw))
    }
}

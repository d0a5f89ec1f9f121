/// Durable key-value storage for the client
///
/// A single JSON object on disk, read once at startup and rewritten on every
/// change. It holds the session (`token`, `user`) and the backup copy of the
/// task list used while the backend is unreachable.
///
/// ```json
/// {
///   "token": "eyJhbGciOi...",
///   "user": {"id": "...", "email": "demo@taskmanager.com", "name": "Demo User"},
///   "task_manager_tasks_v1": [ ... ]
/// }
/// ```
///
/// A missing file is an empty store. A file that doesn't parse is logged and
/// treated as empty, then replaced on the next write.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use taskdesk_shared::models::task::TaskView;
use taskdesk_shared::models::user::UserSummary;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const TASKS_KEY: &str = "task_manager_tasks_v1";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl LocalStorage {
    /// Opens the store at `path`, creating nothing until the first write
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Map<String, Value>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable local storage");
                    Map::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read local storage");
                Map::new()
            }
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a value; entries of the wrong shape read as absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(key, error = %e, "Discarding malformed storage entry");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        let mut next = self.entries.clone();
        next.insert(key.to_string(), value);
        self.commit(next)
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }

        let mut next = self.entries.clone();
        next.remove(key);
        self.commit(next)
    }

    pub fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.get(USER_KEY)
    }

    pub fn save_session(&mut self, token: &str, user: &UserSummary) -> Result<(), StorageError> {
        self.set(TOKEN_KEY, token)?;
        self.set(USER_KEY, user)
    }

    pub fn clear_session(&mut self) -> Result<(), StorageError> {
        self.remove(TOKEN_KEY)?;
        self.remove(USER_KEY)
    }

    /// Backup copy of the task list, empty when never saved
    pub fn tasks(&self) -> Vec<TaskView> {
        self.get(TASKS_KEY).unwrap_or_default()
    }

    pub fn save_tasks(&mut self, tasks: &[TaskView]) -> Result<(), StorageError> {
        self.set(TASKS_KEY, tasks)
    }

    /// Replaces the in-memory entries only once `next` is on disk
    fn commit(&mut self, next: Map<String, Value>) -> Result<(), StorageError> {
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }

    /// Writes through a sibling temp file so a crash never leaves half a document
    fn flush(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let encoded = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Encode {
                key: "*".to_string(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

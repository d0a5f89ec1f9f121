//! Client error types

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API rejected the stored token; credentials have been cleared
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// The API answered with an error envelope
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// The request never got an answer
    #[error("Cannot reach the TaskDesk API: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Unexpected response from the API: {0}")]
    Decode(String),

    /// Input rejected before anything was sent
    #[error("{0}")]
    Validation(String),

    #[error("Task not found in local storage")]
    LocalTaskNotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::SessionExpired => Some(401),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

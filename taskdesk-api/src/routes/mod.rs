/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check and service descriptor
/// - `auth`: Login and token verification
/// - `tasks`: Task CRUD

pub mod auth;
pub mod health;
pub mod tasks;

use crate::error::ErrorResponse;
use axum::{
    extract::OriginalUri,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ "success": true, "message": ... }`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Fallback for unmatched routes
pub async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("Route {} not found", path))),
    )
        .into_response()
}

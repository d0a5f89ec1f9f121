/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; every variant renders the standard
/// failure envelope:
///
/// ```json
/// {
///   "success": false,
///   "error": "Task not found",
///   "code": "TOKEN_EXPIRED",
///   "errors": [{ "field": "email", "message": "Please enter a valid email address" }],
///   "timestamp": "2025-01-01T00:00:00.000Z"
/// }
/// ```
///
/// `code` and `errors` appear only when relevant. Server-side failures carry
/// an [`ErrorDetail`] response extension, which
/// [`crate::middleware::error_detail`] exposes as `stack` in development.
///
/// # Example
///
/// ```
/// use taskdesk_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Task not found".to_string()));
///     }
///     Ok(Json(json!({ "success": true })))
/// }
/// ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskdesk_shared::auth::{authorization::AuthzError, middleware::AuthError, password::PasswordError};
use taskdesk_shared::store::StoreError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Validation failure (400); the first message becomes `error`
    ValidationError(Vec<ValidationErrorDetail>),

    /// Token problems, rendered with their own status and code
    Auth(AuthError),

    /// Too many requests (429)
    RateLimitExceeded { retry_after: u64, message: String },

    /// Store failure while doing `context` ("Error fetching tasks", ...)
    Store { context: &'static str, source: StoreError },

    /// Internal server error (500); the string is never shown to clients
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,

    /// Human-readable error message
    pub error: String,

    /// Machine-readable code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Every validation issue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationErrorDetail>>,

    /// Internal detail, development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: None,
            errors: None,
            stack: None,
            timestamp: now_iso(),
        }
    }
}

/// Internal failure detail attached to 500 responses
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Current time as an ISO-8601 string with milliseconds
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Auth(err) => write!(f, "Authentication failed: {}", err),
            ApiError::RateLimitExceeded { message, .. } => {
                write!(f, "Rate limit exceeded: {}", message)
            }
            ApiError::Store { context, source } => write!(f, "{}: {}", context, source),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

fn internal(message: &str, detail: String) -> Response {
    tracing::error!(error = %detail, "{}", message);

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
        .into_response();
    response.extensions_mut().insert(ErrorDetail(detail));
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(err) => return err.into_response(),
            ApiError::InternalError(detail) => return internal("Internal server error", detail),
            ApiError::Store { context, source } => match source {
                StoreError::UserNotFound => {
                    (StatusCode::NOT_FOUND, ErrorResponse::new("User not found"))
                }
                StoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
                other => return internal(context, other.to_string()),
            },
            ApiError::RateLimitExceeded {
                retry_after,
                message,
            } => {
                let mut response =
                    (StatusCode::TOO_MANY_REQUESTS, Json(ErrorResponse::new(message)))
                        .into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after),
                );
                return response;
            }
            ApiError::ValidationError(errors) => {
                let first = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Validation error".to_string());
                let mut body = ErrorResponse::new(first);
                body.errors = Some(errors);
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::new(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                let field = field.to_string();
                errors.iter().map(move |error| {
                    ValidationErrorDetail::new(
                        field.clone(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid {}", field)),
                    )
                })
            })
            .collect();

        // HashMap order is random; keep the response stable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

/// Extension for mapping store results with an operation-specific message
pub trait StoreResultExt<T> {
    fn context(self, context: &'static str) -> ApiResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn context(self, context: &'static str) -> ApiResult<T> {
        self.map_err(|source| ApiError::Store { context, source })
    }
}

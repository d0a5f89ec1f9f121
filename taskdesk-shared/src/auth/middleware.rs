/// Authentication middleware for Axum
///
/// Validates `Authorization: Bearer <token>` headers and adds an
/// [`AuthContext`] to the request extensions. Failures short-circuit with the
/// standard error envelope:
///
/// | Condition | Status | `code` |
/// |-----------|--------|--------|
/// | Header missing or not `Bearer <token>` | 401 | - |
/// | Token expired | 401 | `TOKEN_EXPIRED` |
/// | Bad signature, issuer or format | 403 | `INVALID_TOKEN` |
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use taskdesk_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn protected_handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.email)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", get(protected_handler))
///     .layer(middleware::from_fn(create_jwt_middleware("secret")));
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};

/// Authenticated identity, available to handlers after [`jwt_auth_middleware`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email carried in the token
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable bearer token on the request
    #[error("Authentication token required")]
    MissingToken,

    /// Token past its expiration
    #[error("Token expired")]
    Expired,

    /// Token failed signature, issuer or format validation
    #[error("Invalid token")]
    InvalidToken(String),
}

impl AuthError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::Expired => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable code, if any
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AuthError::MissingToken => None,
            AuthError::Expired => Some("TOKEN_EXPIRED"),
            AuthError::InvalidToken(_) => Some("INVALID_TOKEN"),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.to_string(),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        if let Some(code) = self.code() {
            body["code"] = json!(code);
        }

        (self.status(), Json(body)).into_response()
    }
}

/// Extracts the token from an `Authorization` header value
///
/// Only the `Bearer <token>` form is accepted.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// JWT authentication middleware
///
/// On success the request carries an [`AuthContext`] extension.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AuthError::MissingToken)?;

    let claims = validate_token(token, &secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthError::from(e)
    })?;

    req.extensions_mut().insert(AuthContext::from(claims));

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use taskdesk_shared::auth::middleware::create_jwt_middleware;
///
/// let app: Router = Router::new()
///     .route("/protected", get(|| async { "OK" }))
///     .layer(middleware::from_fn(create_jwt_middleware("secret")));
/// ```
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

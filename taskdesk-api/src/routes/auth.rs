/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/login` - Exchange email and password for a token
/// - `GET /api/auth/verify` - Resolve the caller's token to a user profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, StoreResultExt},
    extract::ValidatedJson,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use taskdesk_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::user::{UserProfile, UserSummary},
};
use validator::{Validate, ValidationError};

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[serde(default)]
    #[validate(
        email(message = "Please enter a valid email address"),
        length(max = 100, message = "Email is too long")
    )]
    pub email: String,

    /// Password
    #[serde(default)]
    #[validate(custom(function = "password_rules"))]
    pub password: String,
}

fn password_rules(password: &str) -> Result<(), ValidationError> {
    password::validate_password_strength(password)
        .map_err(|message| ValidationError::new("password").with_message(Cow::Owned(message)))
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

/// Verify response
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub data: UserProfile,
}

/// Login with email and password
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "demo@taskmanager.com",
///   "password": "demo123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "message": "Login successful",
///   "token": "eyJ...",
///   "user": { "id": "uuid", "email": "demo@taskmanager.com", "name": "Demo User" }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .store
        .find_user_by_email(&req.email)
        .await
        .context("Internal server error")?;

    // Same response for unknown email and wrong password
    let user = match user {
        Some(user) if password::verify_password(&req.password, &user.password_hash)? => user,
        _ => {
            tracing::info!(email = %req.email, "Failed login attempt");
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let claims = jwt::Claims::new(user.id, &user.email, state.config.jwt.expires_in());
    let token = jwt::create_token(&claims, state.jwt_secret())
        .map_err(|e| ApiError::InternalError(format!("Failed to sign token: {}", e)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserSummary::from(&user),
    }))
}

/// Returns the profile of the token's user
///
/// # Errors
///
/// - `401`/`403`: Token missing, expired or invalid (JWT middleware)
/// - `404 Not Found`: The user no longer exists
pub async fn verify(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<VerifyResponse>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await
        .context("Internal server error")?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(VerifyResponse {
        success: true,
        data: UserProfile::from(&user),
    }))
}

/// Health check endpoint
///
/// Provides a health check endpoint that verifies:
/// - The server is running
/// - The store is reachable, with record counts
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "status": "healthy",
///   "message": "TaskDesk API is running",
///   "timestamp": "2025-01-01T00:00:00.000Z",
///   "environment": "development",
///   "version": "0.1.0",
///   "database": "connected",
///   "counts": { "tasks": 5, "users": 1 }
/// }
/// ```
///
/// An unreachable store answers 503 with `"database": "disconnected"`.

use crate::{app::AppState, error::now_iso};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskdesk_shared::store::{Store, StoreError};

/// Record counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub tasks: i64,
    pub users: i64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,

    /// `healthy` or `unhealthy`
    pub status: String,

    pub message: String,

    pub timestamp: String,

    pub environment: String,

    /// Application version
    pub version: String,

    /// `connected` or `disconnected`
    pub database: String,

    pub counts: Option<Counts>,
}

async fn probe(store: &dyn Store) -> Result<Counts, StoreError> {
    store.ping().await?;
    Ok(Counts {
        tasks: store.count_tasks().await?,
        users: store.count_users().await?,
    })
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let probe = probe(state.store.as_ref()).await;
    let healthy = probe.is_ok();

    if let Err(e) = &probe {
        tracing::warn!(error = %e, "Health check failed");
    }

    let response = HealthResponse {
        success: healthy,
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        message: if healthy {
            "TaskDesk API is running"
        } else {
            "Database connection error"
        }
        .to_string(),
        timestamp: now_iso(),
        environment: state.config.api.environment.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if healthy { "connected" } else { "disconnected" }.to_string(),
        counts: probe.ok(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// `GET /` service descriptor
pub async fn service_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "name": "TaskDesk API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "login": "/api/auth/login",
            "verify": "/api/auth/verify",
            "tasks": "/api/tasks",
            "health": "/api/health",
        },
        "frontend": state.config.api.frontend_url,
        "environment": state.config.api.environment.as_str(),
    }))
}

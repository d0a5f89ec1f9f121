//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory store holding the demo account,
//! so the suites run without PostgreSQL or Redis.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::Config;
use taskdesk_shared::auth::jwt::{create_token, Claims};
use taskdesk_shared::auth::password::hash_password;
use taskdesk_shared::models::user::{CreateUser, User};
use taskdesk_shared::seed::seed_demo_data;
use taskdesk_shared::store::{MemoryStore, Store};
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub jwt_token: String,
}

/// Test configuration with optional overrides
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "memory://"),
        ("JWT_SECRET", JWT_SECRET),
        ("APP_ENV", "test"),
        ("FRONTEND_URL", "http://localhost:3004"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config")
}

impl TestContext {
    /// Demo account, default configuration
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(test_config(&[])).await
    }

    pub async fn with_config(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let summary = seed_demo_data(store.as_ref(), false).await?;

        let jwt_token = token_for(&summary.user, &config)?;

        let state = AppState::new(store.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            store,
            app,
            config,
            user: summary.user,
            jwt_token,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Creates another user and returns it with a token
    pub async fn second_user(&self) -> anyhow::Result<(User, String)> {
        let user = self
            .store
            .create_user(CreateUser {
                email: "other@example.com".to_string(),
                password_hash: hash_password("other123")?,
                name: Some("Other User".to_string()),
            })
            .await?;
        let token = token_for(&user, &self.config)?;
        Ok((user, token))
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a request and parses the JSON body
    pub async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    /// Request builder with the demo user's token
    pub fn authed(&self, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        request(method, uri, Some(&self.auth_header()), body)
    }
}

pub fn token_for(user: &User, config: &Config) -> anyhow::Result<String> {
    let claims = Claims::new(user.id, &user.email, config.jwt.expires_in());
    Ok(create_token(&claims, &config.jwt.secret)?)
}

/// Builds a request with an optional `Authorization` value and JSON body
pub fn request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

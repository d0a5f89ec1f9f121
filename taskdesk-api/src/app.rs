/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_api::{app::AppState, config::Config};
/// use taskdesk_shared::store::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = taskdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        error_detail::{expose_error_detail, handle_panic},
        rate_limit::{
            rate_limit_layer, MemoryRateLimitStore, RateLimitPolicy, RateLimitStore, RateLimiter,
        },
        security::SecurityHeadersLayer,
    },
    routes,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use taskdesk_shared::auth::middleware::create_jwt_middleware;
use taskdesk_shared::store::Store;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Origins always allowed besides `FRONTEND_URL`
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:3004", "http://127.0.0.1:3004"];

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// User and task persistence
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    /// General `/api` limiter
    pub api_limiter: Arc<RateLimiter>,

    /// Stricter `/api/auth` limiter
    pub auth_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Creates new application state with in-process rate limit counters
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self::with_rate_limit_store(store, config, Arc::new(MemoryRateLimitStore::new()))
    }

    /// Creates new application state with the given counter backend
    pub fn with_rate_limit_store(
        store: Arc<dyn Store>,
        config: Config,
        counters: Arc<dyn RateLimitStore>,
    ) -> Self {
        let api_limiter = Arc::new(RateLimiter::new(
            RateLimitPolicy::general(config.rate_limit.max_requests, config.rate_limit.window()),
            counters.clone(),
        ));
        let auth_limiter = Arc::new(RateLimiter::new(
            RateLimitPolicy::auth(config.rate_limit.auth_max_requests, config.rate_limit.auth_window()),
            counters,
        ));

        Self {
            store,
            config: Arc::new(config),
            api_limiter,
            auth_limiter,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Allowed CORS origins: `FRONTEND_URL` plus the local development origins
pub fn allowed_origins(frontend_url: &str) -> Vec<String> {
    let mut origins = vec![frontend_url.to_string()];
    for origin in DEV_ORIGINS {
        if !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins(frontend_url)
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers([
            HeaderName::from_static("content-range"),
            HeaderName::from_static("x-content-range"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /                          # Service descriptor
/// └── /api/                          # General rate limit
///     ├── GET /health                # Store connectivity and counts
///     ├── /auth/                     # Auth rate limit
///     │   ├── POST /login
///     │   └── GET  /verify           # JWT
///     └── /tasks/                    # JWT
///         ├── GET    /               # List caller's tasks
///         ├── POST   /               # Create
///         ├── GET    /:id
///         ├── PUT    /:id            # Partial update
///         ├── DELETE /:id
///         └── PATCH  /:id/toggle     # Flip completed
/// ```
///
/// Unmatched paths get the 404 envelope.
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, tracing, development error
/// detail, panic recovery, then the per-group rate limits and JWT checks.
pub fn build_router(state: AppState) -> Router {
    let secret = state.jwt_secret().to_string();

    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route(
            "/verify",
            get(routes::auth::verify)
                .route_layer(middleware::from_fn(create_jwt_middleware(secret.clone()))),
        )
        .layer(middleware::from_fn_with_state(
            state.auth_limiter.clone(),
            rate_limit_layer,
        ));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/toggle", patch(routes::tasks::toggle_task))
        .route_layer(middleware::from_fn(create_jwt_middleware(secret)));

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .layer(middleware::from_fn_with_state(
            state.api_limiter.clone(),
            rate_limit_layer,
        ));

    let mut app = Router::new()
        .route("/", get(routes::health::service_info))
        .nest("/api", api_routes)
        .fallback(routes::not_found)
        .layer(CatchPanicLayer::custom(handle_panic));

    if state.config.api.environment.is_development() {
        app = app.layer(middleware::from_fn(expose_error_detail));
    }

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
    .layer(cors_layer(&state.config.api.frontend_url))
    .layer(SecurityHeadersLayer::new(
        &state.config.api.frontend_url,
        state.config.api.environment.is_production(),
    ))
    .with_state(state)
}

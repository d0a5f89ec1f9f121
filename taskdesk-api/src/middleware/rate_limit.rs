/// Rate limiting middleware
///
/// Fixed-window request counting keyed by client IP. Two policies are used:
///
/// - **General** (`/api/*`): `RATE_LIMIT_MAX_REQUESTS` per `RATE_LIMIT_WINDOW_MS`
/// - **Auth** (`/api/auth/*`): 10 per 15 minutes, successful responses not counted
///
/// # Storage
///
/// Counters live in process memory ([`MemoryRateLimitStore`]) unless
/// `REDIS_URL` is configured, in which case [`RedisRateLimitStore`] shares
/// them between instances under keys `ratelimit:{policy}:{ip}`. A counter
/// store failure lets the request through.
///
/// A hit given back after its window has rolled over is dropped, so a slow
/// successful login never eats into the next window's count.
///
/// # Headers
///
/// - `RateLimit-Limit`: requests allowed per window
/// - `RateLimit-Remaining`: requests left in the current window
/// - `RateLimit-Reset`: seconds until the window resets
/// - `Retry-After`: seconds to wait (429 responses only)
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use axum::{middleware, routing::get, Router};
/// use taskdesk_api::middleware::rate_limit::{
///     rate_limit_layer, MemoryRateLimitStore, RateLimitPolicy, RateLimiter,
/// };
///
/// let limiter = Arc::new(RateLimiter::new(
///     RateLimitPolicy::general(100, Duration::from_secs(900)),
///     Arc::new(MemoryRateLimitStore::new()),
/// ));
///
/// let app: Router = Router::new()
///     .route("/api/foo", get(|| async { "ok" }))
///     .layer(middleware::from_fn_with_state(limiter, rate_limit_layer));
/// ```

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const GENERAL_MESSAGE: &str = "Too many requests from this IP, please try again later.";
pub const AUTH_MESSAGE: &str = "Too many login attempts, please try again later.";

/// Auth endpoints: 10 attempts per 15 minutes
pub const AUTH_MAX_REQUESTS: u64 = 10;
pub const AUTH_WINDOW: Duration = Duration::from_secs(15 * 60);

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Counter store entries beyond this trigger a sweep of expired windows
const SWEEP_THRESHOLD: usize = 10_000;

/// Limits for one group of routes
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Key prefix, keeps the policies' counters apart
    pub name: &'static str,

    /// Maximum requests per window
    pub max_requests: u64,

    /// Window length
    pub window: Duration,

    /// Body of the 429 response
    pub message: &'static str,

    /// Responses with status < 400 give their hit back
    pub skip_successful: bool,
}

impl RateLimitPolicy {
    pub fn general(max_requests: u64, window: Duration) -> Self {
        Self {
            name: "api",
            max_requests,
            window,
            message: GENERAL_MESSAGE,
            skip_successful: false,
        }
    }

    pub fn auth(max_requests: u64, window: Duration) -> Self {
        Self {
            name: "auth",
            max_requests,
            window,
            message: AUTH_MESSAGE,
            skip_successful: true,
        }
    }
}

/// Counter state after recording a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Requests in the current window, this one included
    pub count: u64,

    /// Time until the window resets
    pub reset_after: Duration,

    /// Identifies the window the hit was counted in
    pub window: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("rate limit store error: {0}")]
pub struct RateLimitStoreError(String);

/// Backend for window counters
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records a request for `key` and returns the window's count
    async fn hit(&self, key: &str, window: Duration) -> Result<Hit, RateLimitStoreError>;

    /// Gives back `hit`, unless its window has since been replaced
    async fn undo(&self, key: &str, hit: &Hit) -> Result<(), RateLimitStoreError>;
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u64,
    window_start: Instant,
    window: u64,
}

/// Per-process counters
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    limits: RwLock<HashMap<String, RateLimitEntry>>,
    next_window: AtomicU64,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`RateLimitStore::hit`] with an explicit clock
    pub async fn hit_at(&self, key: &str, window: Duration, now: Instant) -> Hit {
        let mut limits = self.limits.write().await;

        if limits.len() > SWEEP_THRESHOLD {
            limits.retain(|_, entry| now.duration_since(entry.window_start) < window);
        }

        let entry = limits.entry(key.to_string()).or_insert_with(|| RateLimitEntry {
            count: 0,
            window_start: now,
            window: self.next_window.fetch_add(1, Ordering::Relaxed),
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
            entry.window = self.next_window.fetch_add(1, Ordering::Relaxed);
        }

        entry.count += 1;

        Hit {
            count: entry.count,
            reset_after: window.saturating_sub(now.duration_since(entry.window_start)),
            window: entry.window,
        }
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<Hit, RateLimitStoreError> {
        Ok(self.hit_at(key, window, Instant::now()).await)
    }

    async fn undo(&self, key: &str, hit: &Hit) -> Result<(), RateLimitStoreError> {
        if let Some(entry) = self.limits.write().await.get_mut(key) {
            if entry.window == hit.window {
                entry.count = entry.count.saturating_sub(1);
            }
        }
        Ok(())
    }
}

/// Counters shared through Redis
#[derive(Clone)]
pub struct RedisRateLimitStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisRateLimitStore {
    /// Connects to Redis at `redis_url`
    pub async fn connect(redis_url: &str) -> Result<Self, RateLimitStoreError> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            tracing::error!(error = %e, "Failed to create Redis client");
            RateLimitStoreError(e.to_string())
        })?;

        let conn = redis::aio::ConnectionManager::new(client).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to Redis");
            RateLimitStoreError(e.to_string())
        })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(&self, key: &str, window: Duration) -> Result<Hit, RateLimitStoreError> {
        // The counter is a hash {count, start}; the first hit of a window
        // stamps `start` and sets the expiry in the same atomic step
        let script = redis::Script::new(
            r#"
            local current = redis.call('HINCRBY', KEYS[1], 'count', 1)
            if current == 1 then
                redis.call('HSET', KEYS[1], 'start', ARGV[2])
                redis.call('PEXPIRE', KEYS[1], ARGV[1])
            end
            local ttl = redis.call('PTTL', KEYS[1])
            local start = tonumber(redis.call('HGET', KEYS[1], 'start') or '0')
            return {current, ttl, start}
            "#,
        );

        let mut conn = self.conn.clone();
        let result: Vec<i64> = script
            .key(format!("ratelimit:{}", key))
            .arg(window.as_millis() as u64)
            .arg(chrono::Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitStoreError(e.to_string()))?;

        let count = result.first().copied().unwrap_or(1).max(1) as u64;
        let ttl_ms = result.get(1).copied().unwrap_or(0).max(0) as u64;
        let start = result.get(2).copied().unwrap_or(0).max(0) as u64;

        Ok(Hit {
            count,
            reset_after: Duration::from_millis(ttl_ms),
            window: start,
        })
    }

    async fn undo(&self, key: &str, hit: &Hit) -> Result<(), RateLimitStoreError> {
        let script = redis::Script::new(
            r#"
            local start = tonumber(redis.call('HGET', KEYS[1], 'start') or '-1')
            if start ~= tonumber(ARGV[1]) then
                return 0
            end
            local current = tonumber(redis.call('HGET', KEYS[1], 'count') or '0')
            if current > 0 then
                redis.call('HINCRBY', KEYS[1], 'count', -1)
            end
            return 0
            "#,
        );

        let mut conn = self.conn.clone();
        script
            .key(format!("ratelimit:{}", key))
            .arg(hit.window)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| RateLimitStoreError(e.to_string()))
    }
}

/// A policy bound to its counter store
pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }
}

/// Client address from the connection, "unknown" when not available
pub fn client_ip(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn set_headers(headers: &mut HeaderMap, limit: u64, remaining: u64, reset_secs: u64) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(reset_secs));
}

/// Rate limiting middleware
///
/// Returns 429 with `Retry-After` once the window's quota is spent.
pub async fn rate_limit_layer(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let policy = &limiter.policy;
    let key = format!("{}:{}", policy.name, client_ip(&request));

    let hit = match limiter.store.hit(&key, policy.window).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(error = %e, policy = policy.name, "Rate limit check failed, allowing request");
            return next.run(request).await;
        }
    };

    let reset_secs = hit.reset_after.as_millis().div_ceil(1000) as u64;

    if hit.count > policy.max_requests {
        tracing::warn!(key = %key, count = hit.count, "Rate limit exceeded");

        let mut response = ApiError::RateLimitExceeded {
            retry_after: reset_secs,
            message: policy.message.to_string(),
        }
        .into_response();
        set_headers(response.headers_mut(), policy.max_requests, 0, reset_secs);
        return response;
    }

    let mut response = next.run(request).await;

    let mut count = hit.count;
    if policy.skip_successful && response.status().as_u16() < 400 {
        match limiter.store.undo(&key, &hit).await {
            Ok(()) => count -= 1,
            Err(e) => tracing::warn!(error = %e, "Failed to release rate limit hit"),
        }
    }

    set_headers(
        response.headers_mut(),
        policy.max_requests,
        policy.max_requests.saturating_sub(count),
        reset_secs,
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    fn app(policy: RateLimitPolicy) -> Router {
        let limiter = Arc::new(RateLimiter::new(
            policy,
            Arc::new(MemoryRateLimitStore::new()),
        ));

        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/fail", post(|| async { StatusCode::UNAUTHORIZED }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_layer))
    }

    async fn send(app: &Router, method: &str, uri: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_fixed_window() {
        let store = MemoryRateLimitStore::new();
        let window = Duration::from_secs(60);
        let start = Instant::now();

        assert_eq!(store.hit_at("k", window, start).await.count, 1);
        let hit = store.hit_at("k", window, start + Duration::from_secs(10)).await;
        assert_eq!(hit.count, 2);
        assert_eq!(hit.reset_after, Duration::from_secs(50));

        // Other keys are independent
        assert_eq!(store.hit_at("other", window, start).await.count, 1);

        // New window
        let hit = store.hit_at("k", window, start + Duration::from_secs(60)).await;
        assert_eq!(hit.count, 1);
        assert_eq!(hit.reset_after, window);
    }

    #[tokio::test]
    async fn test_memory_store_undo() {
        let store = MemoryRateLimitStore::new();
        let window = Duration::from_secs(60);

        store.hit("k", window).await.unwrap();
        let hit = store.hit("k", window).await.unwrap();
        store.undo("k", &hit).await.unwrap();
        store.undo("missing", &hit).await.unwrap();

        assert_eq!(store.hit("k", window).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_undo_ignores_hits_from_an_expired_window() {
        let store = MemoryRateLimitStore::new();
        let window = Duration::from_secs(60);
        let start = Instant::now();

        let stale = store.hit_at("k", window, start).await;

        // The window rolls over while the first request is still running
        let fresh = store.hit_at("k", window, start + Duration::from_secs(61)).await;
        assert_eq!(fresh.count, 1);
        assert_ne!(fresh.window, stale.window);

        store.undo("k", &stale).await.unwrap();
        let next = store.hit_at("k", window, start + Duration::from_secs(62)).await;
        assert_eq!(next.count, 2);

        store.undo("k", &next).await.unwrap();
        let last = store.hit_at("k", window, start + Duration::from_secs(63)).await;
        assert_eq!(last.count, 2);
    }

    #[tokio::test]
    async fn test_general_limit_returns_429() {
        let app = app(RateLimitPolicy::general(2, Duration::from_secs(900)));

        let first = send(&app, "GET", "/ok").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers().get("RateLimit-Limit").unwrap(), "2");
        assert_eq!(first.headers().get("RateLimit-Remaining").unwrap(), "1");
        assert_eq!(first.headers().get("RateLimit-Reset").unwrap(), "900");

        assert_eq!(send(&app, "GET", "/ok").await.status(), StatusCode::OK);

        let limited = send(&app, "GET", "/ok").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers().get("RateLimit-Remaining").unwrap(), "0");
        assert!(limited.headers().get("Retry-After").is_some());

        let body = axum::body::to_bytes(limited.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], GENERAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_auth_limit_skips_successful_requests() {
        let app = app(RateLimitPolicy::auth(2, AUTH_WINDOW));

        for _ in 0..5 {
            assert_eq!(send(&app, "GET", "/ok").await.status(), StatusCode::OK);
        }

        assert_eq!(send(&app, "POST", "/fail").await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(send(&app, "POST", "/fail").await.status(), StatusCode::UNAUTHORIZED);

        let limited = send(&app, "POST", "/fail").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = axum::body::to_bytes(limited.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], AUTH_MESSAGE);
    }
}

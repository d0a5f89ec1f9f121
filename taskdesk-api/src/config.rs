/// Configuration management for the API server
///
/// Settings come from environment variables, with a `.env` file loaded first
/// when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string, or `memory://` for the
///   in-memory demo store (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: token signing key, at least 32 characters (required)
/// - `JWT_EXPIRES_IN`: token lifetime such as `7d`, `12h` or `3600`, at most
///   one year (default: 7d)
/// - `HOST` / `PORT`: bind address (default: 0.0.0.0:3005)
/// - `APP_ENV` or `NODE_ENV`: `development`, `production` or `test`
/// - `FRONTEND_URL`: allowed browser origin (default: http://localhost:3004)
/// - `RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_MAX_REQUESTS`: general limiter
///   (default: 900000 ms / 100)
/// - `REDIS_URL`: share rate-limit counters through Redis (optional)
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

/// URL scheme that selects the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory://";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => bail!("Unknown environment '{}'", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,

    /// Browser origin allowed by CORS and the CSP `connect-src`
    pub frontend_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// True when `url` selects the in-memory store
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(MEMORY_DATABASE_URL)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with `openssl rand -hex 32`.
    #[serde(skip_serializing)]
    pub secret: String,

    /// Token lifetime, in seconds
    pub expires_in_seconds: i64,
}

impl JwtConfig {
    pub fn expires_in(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expires_in_seconds)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window of the general `/api` limiter, in milliseconds
    pub window_ms: u64,

    /// Requests allowed per window on `/api`
    pub max_requests: u64,

    /// Window of the login limiter, in milliseconds
    pub auth_window_ms: u64,

    /// Failed login attempts allowed per window
    pub auth_max_requests: u64,

    /// Optional Redis URL for shared counters
    pub redis_url: Option<String>,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn auth_window(&self) -> Duration {
        Duration::from_millis(self.auth_window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 900_000,
            max_requests: 100,
            auth_window_ms: 900_000,
            auth_max_requests: 10,
            redis_url: None,
        }
    }
}

/// Longest accepted token lifetime (365 days)
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 86_400;

/// Parses a token lifetime: `<n>s`, `<n>m`, `<n>h`, `<n>d`, `<n>w`, or bare seconds
pub fn parse_expires_in(raw: &str) -> anyhow::Result<i64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c.to_ascii_lowercase())),
        Some(_) => (raw, None),
        None => bail!("JWT_EXPIRES_IN is empty"),
    };

    let value: i64 = digits
        .trim()
        .parse()
        .with_context(|| format!("Invalid JWT_EXPIRES_IN value '{}'", raw))?;

    let multiplier = match unit {
        None | Some('s') => 1,
        Some('m') => 60,
        Some('h') => 3_600,
        Some('d') => 86_400,
        Some('w') => 604_800,
        Some(other) => bail!("Unknown JWT_EXPIRES_IN unit '{}'", other),
    };

    if value <= 0 {
        bail!("JWT_EXPIRES_IN must be positive");
    }

    let seconds = value
        .checked_mul(multiplier)
        .filter(|s| *s <= MAX_TOKEN_LIFETIME_SECS)
        .ok_or_else(|| anyhow!("JWT_EXPIRES_IN must not exceed one year"))?;

    chrono::Duration::try_seconds(seconds)
        .ok_or_else(|| anyhow!("JWT_EXPIRES_IN is out of range"))?;

    Ok(seconds)
}

impl Config {
    /// Loads configuration from the process environment (and `.env`)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use taskdesk_api::config::Config;
    ///
    /// let vars = HashMap::from([
    ///     ("DATABASE_URL", "memory://"),
    ///     ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
    /// ]);
    /// let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.api.port, 3005);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("PORT")
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("PORT must be a valid port number")?
            .unwrap_or(3005);

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
            Some(raw) => Environment::parse(&raw)?,
            None => Environment::default(),
        };

        let frontend_url = get("FRONTEND_URL")
            .unwrap_or_else(|| "http://localhost:3004".to_string())
            .trim_end_matches('/')
            .to_string();

        let database_url =
            get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = get("DATABASE_MAX_CONNECTIONS")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?
            .unwrap_or(10);

        let jwt_secret =
            get("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let expires_in_seconds = match get("JWT_EXPIRES_IN") {
            Some(raw) => parse_expires_in(&raw)?,
            None => 7 * 86_400,
        };

        let defaults = RateLimitConfig::default();
        let window_ms = get("RATE_LIMIT_WINDOW_MS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("RATE_LIMIT_WINDOW_MS must be a number")?
            .unwrap_or(defaults.window_ms);
        let max_requests = get("RATE_LIMIT_MAX_REQUESTS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("RATE_LIMIT_MAX_REQUESTS must be a number")?
            .unwrap_or(defaults.max_requests);

        if window_ms == 0 {
            bail!("RATE_LIMIT_WINDOW_MS must be greater than zero");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                environment,
                frontend_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_seconds,
            },
            rate_limit: RateLimitConfig {
                window_ms,
                max_requests,
                redis_url: get("REDIS_URL"),
                ..defaults
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "memory://"), ("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3005");
        assert_eq!(config.api.environment, Environment::Development);
        assert_eq!(config.api.frontend_url, "http://localhost:3004");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.is_memory());
        assert_eq!(config.jwt.expires_in_seconds, 604_800);
        assert_eq!(config.rate_limit.window_ms, 900_000);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.auth_max_requests, 10);
        assert!(config.rate_limit.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/taskdesk"),
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRES_IN", "12h"),
            ("PORT", "8080"),
            ("NODE_ENV", "production"),
            ("FRONTEND_URL", "https://tasks.example.com/"),
            ("RATE_LIMIT_MAX_REQUESTS", "5"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert!(config.api.environment.is_production());
        assert_eq!(config.api.frontend_url, "https://tasks.example.com");
        assert!(!config.database.is_memory());
        assert_eq!(config.jwt.expires_in_seconds, 43_200);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(
            config.rate_limit.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );
    }

    #[test]
    fn test_app_env_wins_over_node_env() {
        let config = load(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("APP_ENV", "test"),
            ("NODE_ENV", "production"),
        ])
        .unwrap();
        assert_eq!(config.api.environment, Environment::Test);
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "memory://")]).is_err());
        assert!(load(&[("DATABASE_URL", "memory://"), ("JWT_SECRET", "short")]).is_err());
        assert!(load(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("PORT", "not-a-port"),
        ])
        .is_err());
        assert!(load(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("NODE_ENV", "staging"),
        ])
        .is_err());
    }

    #[test]
    fn test_parse_expires_in() {
        assert_eq!(parse_expires_in("7d").unwrap(), 604_800);
        assert_eq!(parse_expires_in("15m").unwrap(), 900);
        assert_eq!(parse_expires_in("2w").unwrap(), 1_209_600);
        assert_eq!(parse_expires_in("3600").unwrap(), 3600);
        assert_eq!(parse_expires_in("30s").unwrap(), 30);
        assert!(parse_expires_in("").is_err());
        assert!(parse_expires_in("7y").is_err());
        assert!(parse_expires_in("abc").is_err());
        assert!(parse_expires_in("0d").is_err());
    }

    #[test]
    fn test_expires_in_is_capped() {
        assert_eq!(parse_expires_in("365d").unwrap(), MAX_TOKEN_LIFETIME_SECS);
        assert!(parse_expires_in("366d").is_err());
        assert!(parse_expires_in("99999999999999999").is_err());
        assert!(parse_expires_in("9223372036854775807w").is_err());

        let huge = load(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRES_IN", "99999999999999999"),
        ]);
        assert!(huge.is_err());
    }

    #[test]
    fn test_jwt_secret_not_serialized() {
        let config = load(&[("DATABASE_URL", "memory://"), ("JWT_SECRET", SECRET)]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains(SECRET));
    }
}

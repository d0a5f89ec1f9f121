/// Client configuration
///
/// # Environment Variables
///
/// - `TASKDESK_API_URL`: base URL of the API, including `/api`
///   (default: http://localhost:3005/api)
/// - `TASKDESK_DATA_DIR`: directory holding `storage.json`
///   (default: `$HOME/.taskdesk`)
/// - `TASKDESK_TIMEOUT_SECS`: request timeout (default: 10)

use anyhow::{anyhow, Context};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3005/api";

/// File name of the durable key-value store inside the data directory
pub const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without a trailing slash
    pub api_url: String,

    /// Path of the local storage document
    pub storage_path: PathBuf,

    pub timeout: Duration,
}

impl ClientConfig {
    /// Loads configuration from the process environment (and `.env`)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("TASKDESK_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let data_dir = match get("TASKDESK_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => get("HOME")
                .or_else(|| get("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".taskdesk"))
                .ok_or_else(|| anyhow!("Set TASKDESK_DATA_DIR or HOME to locate local storage"))?,
        };

        let timeout_secs = get("TASKDESK_TIMEOUT_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("TASKDESK_TIMEOUT_SECS must be a number of seconds")?
            .unwrap_or(10);

        Ok(Self {
            api_url,
            storage_path: data_dir.join(STORAGE_FILE),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

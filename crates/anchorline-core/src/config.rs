use std::time::Duration;

pub const SESSION_WINDOW_SECS_ENV: &str = "ANCHORLINE_SESSION_WINDOW_SECS";
pub const FINALIZED_RETENTION_SECS_ENV: &str = "ANCHORLINE_FINALIZED_RETENTION_SECS";
pub const HISTORY_LIMIT_ENV: &str = "ANCHORLINE_HISTORY_LIMIT";
pub const HISTORY_RETENTION_SECS_ENV: &str = "ANCHORLINE_HISTORY_RETENTION_SECS";
pub const CONFIDENCE_CAP_ENV: &str = "ANCHORLINE_CONFIDENCE_CAP";
pub const STORE_RETRY_ATTEMPTS_ENV: &str = "ANCHORLINE_STORE_RETRY_ATTEMPTS";
pub const STORE_RETRY_BASE_DELAY_MS_ENV: &str = "ANCHORLINE_STORE_RETRY_BASE_DELAY_MS";

const DEFAULT_SESSION_WINDOW_SECS: u64 = 4 * 3600;
const DEFAULT_FINALIZED_RETENTION_SECS: u64 = 600;
const DEFAULT_HISTORY_LIMIT: usize = 50;
const DEFAULT_HISTORY_RETENTION_SECS: u64 = 30 * 24 * 3600;
const DEFAULT_CONFIDENCE_CAP: f64 = 0.65;
const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_STORE_RETRY_BASE_DELAY_MS: u64 = 25;

/// Runtime tuning for session liveness, retention, and store retry.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session_window_secs: u64,
    pub finalized_retention_secs: u64,
    pub history_limit: usize,
    pub history_retention_secs: u64,
    pub confidence_cap: f64,
    pub store_retry_attempts: u32,
    pub store_retry_base_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_window_secs: DEFAULT_SESSION_WINDOW_SECS,
            finalized_retention_secs: DEFAULT_FINALIZED_RETENTION_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_retention_secs: DEFAULT_HISTORY_RETENTION_SECS,
            confidence_cap: DEFAULT_CONFIDENCE_CAP,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            store_retry_base_delay_ms: DEFAULT_STORE_RETRY_BASE_DELAY_MS,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            session_window_secs: read_env_u64(
                SESSION_WINDOW_SECS_ENV,
                DEFAULT_SESSION_WINDOW_SECS,
                60,
            ),
            finalized_retention_secs: read_env_u64(
                FINALIZED_RETENTION_SECS_ENV,
                DEFAULT_FINALIZED_RETENTION_SECS,
                1,
            ),
            history_limit: read_env_usize(HISTORY_LIMIT_ENV, DEFAULT_HISTORY_LIMIT, 1),
            history_retention_secs: read_env_u64(
                HISTORY_RETENTION_SECS_ENV,
                DEFAULT_HISTORY_RETENTION_SECS,
                3600,
            ),
            confidence_cap: read_env_f64(CONFIDENCE_CAP_ENV)
                .filter(|cap| *cap > 0.0)
                .unwrap_or(DEFAULT_CONFIDENCE_CAP),
            store_retry_attempts: read_env_u32(
                STORE_RETRY_ATTEMPTS_ENV,
                DEFAULT_STORE_RETRY_ATTEMPTS,
                1,
            ),
            store_retry_base_delay_ms: read_env_u64(
                STORE_RETRY_BASE_DELAY_MS_ENV,
                DEFAULT_STORE_RETRY_BASE_DELAY_MS,
                1,
            ),
        }
    }

    #[must_use]
    pub fn session_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_window_secs.min(i64::MAX as u64) as i64)
    }

    #[must_use]
    pub fn finalized_retention(&self) -> Duration {
        Duration::from_secs(self.finalized_retention_secs)
    }

    #[must_use]
    pub fn history_retention(&self) -> Duration {
        Duration::from_secs(self.history_retention_secs)
    }

    #[must_use]
    pub fn store_retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.store_retry_base_delay_ms)
    }
}

#[must_use]
pub(crate) fn read_non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
fn read_env_u64(name: &str, default_value: u64, min_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
fn read_env_u32(name: &str, default_value: u32, min_value: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
fn read_env_usize(name: &str, default_value: usize, min_value: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
fn read_env_f64(name: &str) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
}

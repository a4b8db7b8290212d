//! Per-deployment client settings.

use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_PATH_PREFIX: &str = "/api";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Prepended to every endpoint path, e.g. `/api`.
    pub path_prefix: String,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    /// Anonymous key sent as `apikey` on every request. When set, the token
    /// is also mirrored into `X-User-Token`.
    pub api_key: Option<String>,
    /// Re-validate a restored session against the server on startup instead
    /// of trusting the cached user.
    pub revalidate_session: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            api_key: None,
            revalidate_session: true,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `FINANCE_*` environment variables. Unparseable
    /// values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("FINANCE_API_URL") {
            config.base_url = url;
        }
        if let Ok(prefix) = env::var("FINANCE_API_PREFIX") {
            config.path_prefix = prefix;
        }
        if let Ok(key) = env::var("FINANCE_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Some(timeout) = millis_var("FINANCE_REQUEST_TIMEOUT_MS") {
            config.request_timeout = timeout;
        }
        if let Some(timeout) = millis_var("FINANCE_HEALTH_TIMEOUT_MS") {
            config.health_timeout = timeout;
        }
        if let Ok(flag) = env::var("FINANCE_REVALIDATE_SESSION") {
            match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.revalidate_session = true,
                "0" | "false" | "no" => config.revalidate_session = false,
                other => tracing::warn!(value = other, "ignoring FINANCE_REVALIDATE_SESSION"),
            }
        }
        config
    }

    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = prefix.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_revalidation(mut self, revalidate: bool) -> Self {
        self.revalidate_session = revalidate;
        self
    }
}

fn millis_var(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring non-numeric timeout");
            None
        }
    }
}

//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use ratepivot_fx::loader::{GITHUB_PAGES_ENDPOINT, JSDELIVR_ENDPOINT};
use ratepivot_fx::RateLoaderConfig;

use crate::field_config::Variant;

/// Store file name inside the platform config directory.
const STORE_FILE: &str = "ratepivot/store.json";

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Rate endpoints in preference order.
    pub endpoints: Vec<String>,
    /// Path of the key-value store file.
    pub store_path: PathBuf,
    /// HTTP configuration.
    pub http: HttpConfig,
    /// How long the rate error indicator stays up.
    pub error_display: Duration,
    /// How often a long-running session re-reads the store file.
    pub store_poll: Duration,
    /// Default field layout flavour.
    pub variant: Variant,
    /// Log level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                JSDELIVR_ENDPOINT.to_string(),
                GITHUB_PAGES_ENDPOINT.to_string(),
            ],
            store_path: default_store_path(),
            http: HttpConfig::default(),
            error_display: Duration::from_millis(3000),
            store_poll: Duration::from_millis(1000),
            variant: Variant::Standard,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoints) = std::env::var("RATEPIVOT_ENDPOINTS") {
            config.endpoints = split_endpoints(&endpoints);
        }

        if let Ok(path) = std::env::var("RATEPIVOT_STORE") {
            config.store_path = PathBuf::from(path);
        }

        if let Ok(secs) = std::env::var("RATEPIVOT_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.http.timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(ms) = std::env::var("RATEPIVOT_ERROR_DISPLAY_MS") {
            if let Ok(ms) = ms.parse() {
                config.error_display = Duration::from_millis(ms);
            }
        }

        if let Ok(ms) = std::env::var("RATEPIVOT_STORE_POLL_MS") {
            if let Ok(ms) = ms.parse() {
                config.store_poll = Duration::from_millis(ms);
            }
        }

        if let Ok(variant) = std::env::var("RATEPIVOT_VARIANT") {
            if let Ok(variant) = variant.parse() {
                config.variant = variant;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(bad) = self
            .endpoints
            .iter()
            .find(|e| !(e.starts_with("http://") || e.starts_with("https://")))
        {
            return Err(format!("Endpoint must be an http(s) URL: {bad}"));
        }

        if self.http.timeout.is_zero() {
            return Err("HTTP timeout cannot be zero".to_string());
        }

        if self.store_poll.is_zero() {
            return Err("Store poll interval cannot be zero".to_string());
        }

        if self.store_path.as_os_str().is_empty() {
            return Err("Store path cannot be empty".to_string());
        }

        Ok(())
    }

    /// Loader settings derived from this configuration.
    pub fn loader_config(&self) -> RateLoaderConfig {
        RateLoaderConfig {
            endpoints: self.endpoints.clone(),
            error_display: self.error_display,
        }
    }
}

/// Split a comma-separated endpoint list, dropping blanks.
pub fn split_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_store_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(STORE_FILE))
        .unwrap_or_else(|| PathBuf::from("ratepivot-store.json"))
}

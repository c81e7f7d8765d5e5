use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::utils::{CheckInError, Result};

pub const DEFAULT_API_BASE_URL: &str = "http://10.0.2.2:8000/api";
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 122_000;
pub const DEFAULT_SUCCESS_DISPLAY_MS: u64 = 20_000;

/// Runtime settings of one kiosk.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub api_base_url: String,
    /// Tenant the kiosk checks visitors in for; sent with stored details.
    pub client_id: String,
    pub request_timeout_secs: u64,
    pub idle_timeout_ms: u64,
    pub success_display_ms: u64,
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            client_id: String::new(),
            request_timeout_secs: 30,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            success_display_ms: DEFAULT_SUCCESS_DISPLAY_MS,
        }
    }
}

impl KioskConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    /// Loads `.env` if present, then reads the `KIOSK_*` variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Self::build(|key| std::env::var(key))
    }

    /// Reads a JSON file; keys left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| CheckInError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    fn build<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let defaults = KioskConfig::default();

        let parse_u64 = |var: &str, default: u64| -> Result<u64> {
            match lookup(var) {
                Ok(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| CheckInError::ConfigError(format!("{}: {}", var, e))),
                Err(_) => Ok(default),
            }
        };

        let config = KioskConfig {
            api_base_url: lookup("KIOSK_API_BASE_URL").unwrap_or(defaults.api_base_url),
            client_id: lookup("KIOSK_CLIENT_ID").unwrap_or(defaults.client_id),
            request_timeout_secs: parse_u64("KIOSK_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            idle_timeout_ms: parse_u64("KIOSK_IDLE_TIMEOUT_MS", defaults.idle_timeout_ms)?,
            success_display_ms: parse_u64("KIOSK_SUCCESS_DISPLAY_MS", defaults.success_display_ms)?,
        };

        if config.api_base_url.trim().is_empty() {
            return Err(CheckInError::ConfigError("KIOSK_API_BASE_URL is empty".to_string()));
        }

        Ok(config)
    }
}

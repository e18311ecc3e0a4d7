//! Configuration module for the docman client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Default base URL of the remote document management service.
pub const DEFAULT_REMOTE_URL: &str = "https://apis.allsoft.co/api/documentManagement";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the local form service (optional)
    pub api_psk: Option<String>,
    /// Base URL of the remote document management service
    pub remote_url: String,
    /// Address to bind the form service to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Timeout applied to every remote call
    pub request_timeout: Duration,
    /// Quiet window before a tag lookup fires
    pub debounce: Duration,
    /// JSON file overriding the built-in category table
    pub categories_path: Option<PathBuf>,
    /// Token to seed the session with
    pub token: Option<String>,
    /// Requester identity to seed the session with
    pub user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_psk: None,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            request_timeout: Duration::from_secs(30),
            debounce: Duration::from_millis(300),
            categories_path: None,
            token: None,
            user_id: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let bind_addr = match env::var("DOCMAN_BIND_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Validation(format!("Invalid DOCMAN_BIND_ADDR: {}", raw)))?,
            Err(_) => defaults.bind_addr,
        };

        let request_timeout = match env::var("DOCMAN_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(parse_number("DOCMAN_REQUEST_TIMEOUT_SECS", &raw)?),
            Err(_) => defaults.request_timeout,
        };

        let debounce = match env::var("DOCMAN_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(parse_number("DOCMAN_DEBOUNCE_MS", &raw)?),
            Err(_) => defaults.debounce,
        };

        Ok(Self {
            api_psk: non_empty_var("DOCMAN_API_PSK"),
            remote_url: non_empty_var("DOCMAN_REMOTE_URL").unwrap_or(defaults.remote_url),
            bind_addr,
            log_level: non_empty_var("DOCMAN_LOG_LEVEL").unwrap_or(defaults.log_level),
            request_timeout,
            debounce,
            categories_path: non_empty_var("DOCMAN_CATEGORIES_PATH").map(PathBuf::from),
            token: non_empty_var("DOCMAN_TOKEN"),
            user_id: non_empty_var("DOCMAN_USER_ID"),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid {}: {}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 9] = [
        "DOCMAN_API_PSK",
        "DOCMAN_REMOTE_URL",
        "DOCMAN_BIND_ADDR",
        "DOCMAN_LOG_LEVEL",
        "DOCMAN_REQUEST_TIMEOUT_SECS",
        "DOCMAN_DEBOUNCE_MS",
        "DOCMAN_CATEGORIES_PATH",
        "DOCMAN_TOKEN",
        "DOCMAN_USER_ID",
    ];

    // Environment is process-wide; keep every env assertion in one test.
    #[test]
    fn test_config_from_env() {
        for key in KEYS {
            env::remove_var(key);
        }

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.remote_url, DEFAULT_REMOTE_URL);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert!(config.token.is_none());

        env::set_var("DOCMAN_DEBOUNCE_MS", "150");
        env::set_var("DOCMAN_TOKEN", "tok-1");
        env::set_var("DOCMAN_USER_ID", "  ");
        let config = Config::from_env().unwrap();
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.token.as_deref(), Some("tok-1"));
        assert!(config.user_id.is_none());

        env::set_var("DOCMAN_BIND_ADDR", "not-an-addr");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        for key in KEYS {
            env::remove_var(key);
        }
    }
}

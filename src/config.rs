// Configuration management

use serde::{Deserialize, Serialize};
use std::env;

use crate::core::constants::env as env_keys;
use crate::core::errors::BridgeError;
use crate::routing::normalize_base_path;

/// Server configuration loaded from environment variables.
///
/// All values are validated on load with clear error messages; a bad
/// configuration aborts startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub port: u16,
    pub base_path: String,
    pub cors_enabled: bool,
    pub keep_alive_secs: u64,

    // Middleware
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Upstream proxy client
    pub proxy_timeout_secs: u64,

    // Logging
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables, with `.env` support
    /// in development.
    pub fn from_env() -> Result<Self, BridgeError> {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // file may not exist
        }

        let config = Self {
            bind_address: Self::get_env_or_default(env_keys::BIND_ADDRESS, "0.0.0.0"),
            port: Self::parse_port()?,
            base_path: normalize_base_path(&Self::get_env_or_default(env_keys::BASE_PATH, "")),
            cors_enabled: Self::parse_bool_or_default(env_keys::CORS_ENABLED, false)?,
            keep_alive_secs: Self::parse_u64_or_default(env_keys::KEEP_ALIVE_SECS, 600)?,
            request_timeout_secs: Self::parse_u64_or_default(env_keys::REQUEST_TIMEOUT_SECS, 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default(
                env_keys::BODY_SIZE_LIMIT_BYTES,
                2 * 1024 * 1024,
            )?,
            proxy_timeout_secs: Self::parse_u64_or_default(env_keys::PROXY_TIMEOUT_SECS, 240)?,
            log_level: Self::get_env_or_default(env_keys::LOG_LEVEL, "info"),
            log_format: Self::get_env_or_default(env_keys::LOG_FORMAT, "text"),
        };

        config.validate()?;
        Ok(config)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn parse_port() -> Result<u16, BridgeError> {
        let port_str = env::var(env_keys::PORT).unwrap_or_else(|_| "4723".to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            BridgeError::Configuration(format!("invalid PORT value '{port_str}': {e}"))
        })?;
        if port == 0 {
            return Err(BridgeError::Configuration(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }
        Ok(port)
    }

    fn parse_bool_or_default(key: &str, default: bool) -> Result<bool, BridgeError> {
        match env::var(key) {
            Ok(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                other => Err(BridgeError::Configuration(format!(
                    "invalid {key} value '{other}': expected true or false"
                ))),
            },
            _ => Ok(default),
        }
    }

    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, BridgeError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    BridgeError::Configuration(format!("invalid {key} value '{value}': {e}"))
                })?;
                if parsed == 0 {
                    return Err(BridgeError::Configuration(format!(
                        "{key} must be greater than 0"
                    )));
                }
                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, BridgeError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    BridgeError::Configuration(format!("invalid {key} value '{value}': {e}"))
                })?;
                if parsed == 0 {
                    return Err(BridgeError::Configuration(format!(
                        "{key} must be greater than 0"
                    )));
                }
                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    fn validate(&self) -> Result<(), BridgeError> {
        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;
        // base_path is normalized on load; re-normalizing must be a no-op.
        debug_assert_eq!(normalize_base_path(&self.base_path), self.base_path);
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), BridgeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(BridgeError::Configuration(format!(
                "invalid LOG_LEVEL '{level}': must be one of {}",
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), BridgeError> {
        if format != "json" && format != "text" {
            return Err(BridgeError::Configuration(format!(
                "invalid LOG_FORMAT '{format}': must be 'json' or 'text'"
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 4723,
            base_path: String::new(),
            cors_enabled: false,
            keep_alive_secs: 600,
            request_timeout_secs: 30,
            body_size_limit_bytes: 2 * 1024 * 1024,
            proxy_timeout_secs: 240,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

//! Application state
//!
//! Holds configuration and the registered cameras

use crate::platform::{CameraRegistry, PlatformConfig, WhitelistMode, DEFAULT_NAME};
use crate::syno_api::DEFAULT_TIMEOUT_SECS;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// NAS connection and camera selection
    pub platform: PlatformConfig,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let platform = PlatformConfig {
            name: std::env::var("SYNO_NAME").unwrap_or_else(|_| DEFAULT_NAME.to_string()),
            username: std::env::var("SYNO_USERNAME").unwrap_or_default(),
            password: std::env::var("SYNO_PASSWORD").unwrap_or_default(),
            url: std::env::var("SYNO_URL").unwrap_or_default(),
            whitelist: std::env::var("SYNO_WHITELIST")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            valid_cert: env_parsed("SYNO_VALID_CERT", parse_bool).unwrap_or(true),
            whitelist_mode: env_parsed("SYNO_WHITELIST_MODE", |v| {
                v.parse::<WhitelistMode>().ok()
            })
            .unwrap_or_default(),
            timeout_secs: env_parsed("SYNO_TIMEOUT_SEC", |v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Self {
            platform,
            port: env_parsed("PORT", |v| v.trim().parse().ok()).unwrap_or(8080),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }
}

fn env_parsed<T>(key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    parse_setting(key, std::env::var(key).ok(), parse)
}

/// Parse a raw setting; a value that does not parse is logged and ignored
fn parse_setting<T>(
    key: &str,
    raw: Option<String>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let raw = raw?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!(key = %key, value = %raw, "Invalid setting ignored, using default");
    }
    parsed
}

/// Comma separated list, blanks dropped
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Cameras registered at setup
    pub cameras: Arc<CameraRegistry>,
}

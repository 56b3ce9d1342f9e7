//! Platform configuration types

use crate::error::{Error, Result};
use crate::syno_api::{CameraDescriptor, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NAME: &str = "Synology Camera";

/// How a non-empty whitelist is applied to enumerated cameras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistMode {
    /// Any non-empty whitelist suppresses every camera (historic behavior)
    #[default]
    Legacy,
    /// Keep only cameras whose name or id is listed
    Restrict,
}

impl FromStr for WhitelistMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "restrict" => Ok(Self::Restrict),
            other => Err(Error::Config(format!(
                "unknown whitelist mode '{}', expected legacy or restrict",
                other
            ))),
        }
    }
}

/// Settings for one Synology NAS
#[derive(Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub url: String,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default = "default_valid_cert")]
    pub valid_cert: bool,
    #[serde(default)]
    pub whitelist_mode: WhitelistMode,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_valid_cert() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"***")
            .field("url", &self.url)
            .field("whitelist", &self.whitelist)
            .field("valid_cert", &self.valid_cert)
            .field("whitelist_mode", &self.whitelist_mode)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PlatformConfig {
    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Validation("username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("password is required".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(Error::Validation("url is required".to_string()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Validation(format!(
                "url must start with http:// or https://, got {}",
                self.url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Validation("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Cameras that should become adapters, in NAS order
    pub fn select_cameras(&self, cameras: Vec<CameraDescriptor>) -> Vec<CameraDescriptor> {
        if self.whitelist.is_empty() {
            return cameras;
        }

        match self.whitelist_mode {
            WhitelistMode::Legacy => {
                tracing::warn!(
                    whitelist = ?self.whitelist,
                    suppressed = cameras.len(),
                    "Non-empty whitelist in legacy mode suppresses all cameras; \
                     set whitelist_mode=restrict to keep the listed ones"
                );
                Vec::new()
            }
            WhitelistMode::Restrict => cameras
                .into_iter()
                .filter(|c| self.whitelist.iter().any(|w| *w == c.name || *w == c.id))
                .collect(),
        }
    }
}

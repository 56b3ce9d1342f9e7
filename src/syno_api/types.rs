//! Synology Web API Types
//!
//! Wire types for the Surveillance Station web API and the values the rest of
//! the crate derives from them.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

// ========================================
// API names and fixed request values
// ========================================

pub const WEBAPI_PATH: &str = "/webapi/";
pub const QUERY_CGI: &str = "query.cgi";

pub const QUERY_API: &str = "SYNO.API.Info";
pub const AUTH_API: &str = "SYNO.API.Auth";
pub const CAMERA_API: &str = "SYNO.SurveillanceStation.Camera";
pub const STREAMING_API: &str = "SYNO.SurveillanceStation.VideoStream";

/// Versions requested from each sub-API
pub const AUTH_VERSION: u32 = 2;
pub const CAMERA_VERSION: u32 = 1;
pub const STREAMING_VERSION: u32 = 1;

/// Session namespace the login is scoped to
pub const SESSION_NAME: &str = "SurveillanceStation";

/// Cookie carrying the session id on authenticated calls
pub const SESSION_COOKIE: &str = "id";

/// Used when a snapshot response carries no content type
pub const DEFAULT_SNAPSHOT_CONTENT_TYPE: &str = "image/jpeg";

/// One still image with the content type the NAS declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content_type: String,
    pub data: Bytes,
}

// ========================================
// Response envelope
// ========================================

/// Envelope every Synology web API response is wrapped in
///
/// `success` is absent on some firmware's `query.cgi` answers, so it
/// defaults to true and only an explicit `false` counts as a failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

fn default_success() -> bool {
    true
}

/// Vendor error payload (`{"code": 105}`)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
}

impl<T> ApiResponse<T> {
    /// Unwrap `data`, turning `success: false` or a missing payload into an API error
    pub fn into_data(self, what: &str) -> Result<T> {
        if !self.success {
            let code = self.error.map(|e| e.code).unwrap_or(-1);
            return Err(Error::Api(format!("{} failed with vendor code {}", what, code)));
        }

        self.data
            .ok_or_else(|| Error::Api(format!("{} response has no data", what)))
    }
}

// ========================================
// Discovery
// ========================================

/// One entry of the `query.cgi` answer
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    pub path: String,
    #[serde(default, rename = "minVersion")]
    pub min_version: Option<u32>,
    #[serde(default, rename = "maxVersion")]
    pub max_version: Option<u32>,
}

impl ApiInfo {
    /// Whether `version` is inside the advertised range; missing bounds are open
    pub fn supports(&self, version: u32) -> bool {
        self.min_version.map_or(true, |min| version >= min)
            && self.max_version.map_or(true, |max| version <= max)
    }
}

/// Resolved relative paths of the sub-APIs this crate talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointMap {
    pub auth: String,
    pub camera: String,
    pub streaming: String,
}

impl EndpointMap {
    /// Build the map from the `data` object of a `query.cgi` response
    ///
    /// Every required API must be present with a non-empty path.
    pub fn from_info(info: &HashMap<String, ApiInfo>) -> Result<Self> {
        let path_of = |api: &str| -> Result<String> {
            match info.get(api) {
                Some(entry) if !entry.path.trim().is_empty() => Ok(entry.path.trim().to_string()),
                Some(_) => Err(Error::Api(format!("empty path for {}", api))),
                None => Err(Error::Api(format!("{} missing from API info", api))),
            }
        };

        Ok(Self {
            auth: path_of(AUTH_API)?,
            camera: path_of(CAMERA_API)?,
            streaming: path_of(STREAMING_API)?,
        })
    }
}

// ========================================
// Authentication
// ========================================

/// `data` of a successful Login call
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub sid: String,
}

/// Opaque session id issued by the NAS
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Cookie` header value for authenticated calls
    pub fn cookie(&self) -> String {
        format!("{}={}", SESSION_COOKIE, self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Account used for every login against one NAS
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ========================================
// Cameras
// ========================================

/// `data` of a Camera List call
#[derive(Debug, Clone, Deserialize)]
pub struct CameraListData {
    #[serde(default)]
    pub cameras: Vec<CameraDescriptor>,
}

/// A camera as enumerated by the NAS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Vendor id; numeric on current firmware but treated as opaque
    #[serde(deserialize_with = "deserialize_camera_id")]
    pub id: String,
    pub name: String,
    pub snapshot_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

fn deserialize_camera_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "camera id must be a string or number, got {}",
            other
        ))),
    }
}

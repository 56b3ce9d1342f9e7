//! Shared response models for the HTTP surface

use crate::camera_adapter::{CameraDevice, SessionState, SynologyCamera};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub platform: String,
    pub cameras: usize,
}

/// Camera as listed by `GET /api/cameras`
#[derive(Debug, Clone, Serialize)]
pub struct CameraSummary {
    pub camera_id: String,
    pub name: String,
    pub snapshot_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    pub session: SessionState,
}

impl From<&SynologyCamera> for CameraSummary {
    fn from(camera: &SynologyCamera) -> Self {
        let descriptor = camera.descriptor();
        Self {
            camera_id: camera.camera_id().to_string(),
            name: camera.name().to_string(),
            snapshot_path: descriptor.snapshot_path.clone(),
            model: descriptor.model.clone(),
            vendor: descriptor.vendor.clone(),
            session: camera.session_state(),
        }
    }
}

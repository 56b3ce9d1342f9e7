//! Registered camera devices, in setup order

use crate::camera_adapter::{CameraDevice, SynologyCamera};
use std::sync::Arc;

#[derive(Default)]
pub struct CameraRegistry {
    cameras: Vec<Arc<SynologyCamera>>,
}

impl CameraRegistry {
    pub fn new(cameras: Vec<Arc<SynologyCamera>>) -> Self {
        Self { cameras }
    }

    pub fn get(&self, camera_id: &str) -> Option<Arc<SynologyCamera>> {
        self.cameras
            .iter()
            .find(|c| c.camera_id() == camera_id)
            .cloned()
    }

    pub fn all(&self) -> &[Arc<SynologyCamera>] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }
}

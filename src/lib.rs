//! Synology Surveillance Station camera proxy
//!
//! Exposes every camera of a Synology NAS as a still-image source and an
//! MJPEG live-stream proxy.
//!
//! ## Components
//!
//! 1. SynoClient - vendor web API adapter (discovery, login, list, snapshot, stream)
//! 2. Platform - setup flow and camera registry
//! 3. CameraAdapter - per-camera session, snapshot fetch, MJPEG relay
//! 4. WebAPI - HTTP endpoints over the registered cameras

pub mod camera_adapter;
pub mod error;
pub mod models;
pub mod platform;
pub mod state;
pub mod syno_api;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;

//! WebAPI - HTTP surface for registered cameras
//!
//! ## Responsibilities
//!
//! - Camera listing
//! - Still image endpoint
//! - MJPEG proxy endpoint

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: state.config.platform.name.clone(),
        cameras: state.cameras.len(),
    })
}

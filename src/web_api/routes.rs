//! API Routes

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::camera_adapter::{CameraDevice, SynologyCamera};
use crate::error::{Error, Result};
use crate::models::{ApiResponse, CameraSummary};
use crate::state::AppState;
use std::sync::Arc;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(super::health_check))
        .route("/api/cameras", get(list_cameras))
        .route("/api/cameras/:id/snapshot", get(get_snapshot))
        .route("/api/cameras/:id/mjpeg", get(get_mjpeg_stream))
        .with_state(state)
}

fn find_camera(state: &AppState, camera_id: &str) -> Result<Arc<SynologyCamera>> {
    state
        .cameras
        .get(camera_id)
        .ok_or_else(|| Error::NotFound(format!("camera {}", camera_id)))
}

async fn list_cameras(State(state): State<AppState>) -> impl IntoResponse {
    let cameras: Vec<CameraSummary> = state
        .cameras
        .all()
        .iter()
        .map(|c| CameraSummary::from(c.as_ref()))
        .collect();

    Json(ApiResponse::success(cameras))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Response> {
    let camera = find_camera(&state, &camera_id)?;

    match camera.capture_snapshot().await? {
        Some(shot) => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, shot.content_type),
                (
                    header::CACHE_CONTROL,
                    "no-cache, no-store, must-revalidate".to_string(),
                ),
            ],
            shot.data,
        )
            .into_response()),
        None => Err(Error::Timeout(format!("snapshot of camera {}", camera_id))),
    }
}

async fn get_mjpeg_stream(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Response> {
    let camera = find_camera(&state, &camera_id)?;

    tracing::info!(camera_id = %camera_id, "MJPEG stream requested");

    Ok(camera.open_mjpeg_stream().await?.into_response())
}

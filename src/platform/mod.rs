//! Platform setup
//!
//! discover → login → list → one adapter per selected camera → concurrent
//! per-camera logins → registration. Discovery and enumeration failures
//! abort setup; per-camera login failures do not.

pub mod registry;
pub mod types;

use crate::camera_adapter::SynologyCamera;
use crate::error::{Error, Result};
use crate::syno_api::{Credentials, SynoClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub use registry::CameraRegistry;
pub use types::{PlatformConfig, WhitelistMode, DEFAULT_NAME};

/// Build one adapter per selected camera on the NAS
///
/// Returns only after every adapter has attempted its own login. A camera
/// whose login failed is still returned; its calls fail later.
pub async fn setup_platform(config: &PlatformConfig) -> Result<Vec<Arc<SynologyCamera>>> {
    config.validate()?;

    let client = SynoClient::new(
        &config.url,
        config.valid_cert,
        Duration::from_secs(config.timeout_secs),
    )?;
    let credentials = Arc::new(Credentials {
        username: config.username.clone(),
        password: config.password.clone(),
    });

    tracing::info!(
        platform = %config.name,
        url = %client.base_url(),
        valid_cert = client.valid_cert(),
        timeout_ms = client.request_timeout().as_millis() as u64,
        "Setting up Synology platform"
    );

    let endpoints = Arc::new(client.discover().await?);

    let session = client
        .login(&endpoints.auth, &credentials)
        .await
        .ok_or_else(|| {
            Error::Unauthorized(format!("login to {} failed, cannot list cameras", client.base_url()))
        })?;

    let cameras = client.list_cameras(&endpoints.camera, &session).await?;
    let listed = cameras.len();
    let selected = config.select_cameras(cameras);

    tracing::info!(
        platform = %config.name,
        listed = listed,
        selected = selected.len(),
        "Cameras enumerated"
    );

    let runtime = Handle::current();
    let devices: Vec<Arc<SynologyCamera>> = selected
        .into_iter()
        .map(|descriptor| {
            Arc::new(SynologyCamera::new(
                descriptor,
                endpoints.clone(),
                client.clone(),
                credentials.clone(),
                runtime.clone(),
            ))
        })
        .collect();

    futures::future::join_all(devices.iter().map(|d| d.read_session())).await;

    tracing::info!(
        platform = %config.name,
        cameras = devices.len(),
        "Synology platform ready"
    );

    Ok(devices)
}

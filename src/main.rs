//! Synology camera proxy - main entry point

use std::sync::Arc;
use syno_camserver::{
    platform::{setup_platform, CameraRegistry},
    state::{AppConfig, AppState},
    web_api,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "syno_camserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Synology camera proxy v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        name = %config.platform.name,
        url = %config.platform.url,
        valid_cert = config.platform.valid_cert,
        whitelist = ?config.platform.whitelist,
        whitelist_mode = ?config.platform.whitelist_mode,
        "Configuration loaded"
    );

    let cameras = match setup_platform(&config.platform).await {
        Ok(cameras) => cameras,
        Err(e) => {
            tracing::error!(error = %e, "Synology platform setup failed");
            return Err(e.into());
        }
    };

    let state = AppState {
        config: config.clone(),
        cameras: Arc::new(CameraRegistry::new(cameras)),
    };

    let app = web_api::create_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

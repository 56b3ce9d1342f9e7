//! CameraAdapter - One Surveillance Station camera exposed to the host
//!
//! ## Responsibilities
//!
//! - Own the camera identity and its own session token
//! - Still image fetch (async, plus a blocking bridge for sync callers)
//! - MJPEG stream proxy (upstream content type kept, chunked body)
//!
//! The session token is written once by `read_session` and never refreshed.
//! An expired session shows up as failing calls; nothing here retries.

pub mod relay;

use crate::error::{Error, Result};
use crate::syno_api::{
    CameraDescriptor, Credentials, EndpointMap, SessionToken, Snapshot, SynoClient,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tracing::Instrument;

pub use relay::{
    channel_sink, relay_mjpeg, ChannelSink, ChunkSink, HttpUpstream, RelayEnd, RelayStats,
    Upstream, DEFAULT_MJPEG_CONTENT_TYPE, RELAY_CHUNK_SIZE,
};

/// Chunks buffered between the relay task and the HTTP body
const RELAY_CHANNEL_CAPACITY: usize = 8;

/// Camera operations the host platform consumes
#[async_trait]
pub trait CameraDevice: Send + Sync {
    fn name(&self) -> &str;

    fn camera_id(&self) -> &str;

    /// Current still image; `None` when the NAS did not answer in time
    async fn fetch_snapshot(&self) -> Result<Option<Bytes>>;

    /// Live MJPEG proxy; `Error::GatewayTimeout` when the NAS did not connect in time
    async fn open_mjpeg_stream(&self) -> Result<MjpegStream>;
}

/// Session state of one adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Login not attempted yet
    Unauthenticated,
    /// Login attempted and a sid was stored
    Authenticated,
    /// Login attempted and failed; calls will be refused
    NoSession,
}

/// A Synology Surveillance Station camera
pub struct SynologyCamera {
    descriptor: CameraDescriptor,
    endpoints: Arc<EndpointMap>,
    client: SynoClient,
    credentials: Arc<Credentials>,
    /// `Some(None)` is the failed-login sentinel
    session: OnceLock<Option<SessionToken>>,
    runtime: Handle,
    span: tracing::Span,
}

impl SynologyCamera {
    /// Create an adapter; it is unauthenticated until `read_session` runs
    ///
    /// `runtime` is where the blocking `camera_image` bridge schedules work.
    pub fn new(
        descriptor: CameraDescriptor,
        endpoints: Arc<EndpointMap>,
        client: SynoClient,
        credentials: Arc<Credentials>,
        runtime: Handle,
    ) -> Self {
        let span = tracing::info_span!(
            "camera",
            camera_id = %descriptor.id,
            name = %descriptor.name
        );

        Self {
            descriptor,
            endpoints,
            client,
            credentials,
            session: OnceLock::new(),
            runtime,
            span,
        }
    }

    pub fn descriptor(&self) -> &CameraDescriptor {
        &self.descriptor
    }

    pub fn snapshot_path(&self) -> &str {
        &self.descriptor.snapshot_path
    }

    pub fn session_state(&self) -> SessionState {
        match self.session.get() {
            None => SessionState::Unauthenticated,
            Some(Some(_)) => SessionState::Authenticated,
            Some(None) => SessionState::NoSession,
        }
    }

    /// Log in with this adapter's own session
    ///
    /// Runs once; later calls keep the first outcome.
    pub async fn read_session(&self) {
        if self.session.get().is_some() {
            tracing::debug!(parent: &self.span, "Session already read");
            return;
        }

        let token = self
            .client
            .login(&self.endpoints.auth, &self.credentials)
            .instrument(self.span.clone())
            .await;

        if token.is_none() {
            tracing::warn!(parent: &self.span, "No session available for camera");
        }

        if self.session.set(token).is_err() {
            tracing::debug!(parent: &self.span, "Concurrent session read, keeping first");
        }
    }

    fn session(&self) -> Result<&SessionToken> {
        match self.session.get() {
            Some(Some(token)) => Ok(token),
            _ => Err(Error::Unauthorized(format!(
                "no session for camera {}",
                self.descriptor.id
            ))),
        }
    }

    /// Blocking still image fetch for callers outside the runtime
    ///
    /// Schedules the fetch on the runtime handed to `new` and parks the
    /// calling thread until it finishes. Calling this from a runtime worker
    /// thread deadlocks (current-thread runtime) or stalls a worker; use
    /// `fetch_snapshot` there, or call from `spawn_blocking`.
    pub fn camera_image(self: &Arc<Self>) -> Result<Option<Bytes>> {
        let camera = Arc::clone(self);
        let task = self
            .runtime
            .spawn(async move { camera.fetch_snapshot().await });

        futures::executor::block_on(task)
            .map_err(|e| Error::Internal(format!("snapshot task failed: {}", e)))?
    }

    /// Current still image together with the content type the NAS sent
    pub async fn capture_snapshot(&self) -> Result<Option<Snapshot>> {
        let session = self.session()?;
        let snapshot = self
            .client
            .get_snapshot(&self.endpoints.camera, &self.descriptor.id, session)
            .instrument(self.span.clone())
            .await?;

        if let Some(ref shot) = snapshot {
            tracing::debug!(
                parent: &self.span,
                size = shot.data.len(),
                content_type = %shot.content_type,
                "Snapshot fetched"
            );
        }

        Ok(snapshot)
    }

    /// Connect to the NAS stream without starting the relay
    pub async fn connect_mjpeg(&self) -> Result<HttpUpstream> {
        let session = self.session()?;
        let response = self
            .client
            .open_stream(&self.endpoints.streaming, &self.descriptor.id, session)
            .instrument(self.span.clone())
            .await?;

        Ok(HttpUpstream::new(response))
    }

    /// Connect and relay the stream into `sink` until either side ends
    pub async fn stream_mjpeg_to<S: ChunkSink>(&self, sink: S) -> Result<RelayStats> {
        let upstream = self.connect_mjpeg().await?;
        Ok(relay_mjpeg(upstream, sink).instrument(self.span.clone()).await)
    }
}

#[async_trait]
impl CameraDevice for SynologyCamera {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn camera_id(&self) -> &str {
        &self.descriptor.id
    }

    async fn fetch_snapshot(&self) -> Result<Option<Bytes>> {
        Ok(self.capture_snapshot().await?.map(|shot| shot.data))
    }

    async fn open_mjpeg_stream(&self) -> Result<MjpegStream> {
        let upstream = self.connect_mjpeg().await?;
        let content_type = upstream.content_type().to_string();
        let (sink, body) = channel_sink(RELAY_CHANNEL_CAPACITY);

        let span = self.span.clone();
        tokio::spawn(
            async move {
                let stats = relay_mjpeg(upstream, sink).await;
                tracing::debug!(
                    chunks = stats.chunks,
                    bytes = stats.bytes,
                    end = ?stats.end,
                    "MJPEG relay finished"
                );
            }
            .instrument(span),
        );

        Ok(MjpegStream {
            content_type,
            body: Box::pin(body),
        })
    }
}

type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send>>;

/// Proxied MJPEG response
pub struct MjpegStream {
    pub content_type: String,
    pub body: BodyStream,
}

impl IntoResponse for MjpegStream {
    fn into_response(self) -> Response {
        // No content length, so hyper frames the body as chunked
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            Body::from_stream(self.body),
        )
            .into_response()
    }
}

//! SynoClient - Surveillance Station Web API Adapter
//!
//! ## Responsibilities
//!
//! - API discovery via `query.cgi` (paths are versioned and relocatable)
//! - Session login (`format=sid`)
//! - Camera enumeration, snapshot fetch, MJPEG stream connect
//!
//! Every call is a GET with query parameters. Authenticated calls carry the
//! session id in the `id` cookie. Each exchange is bounded by the client's
//! request timeout; the MJPEG stream is bounded only until headers arrive.

pub mod types;

use crate::error::{Error, Result};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;

pub use types::*;

/// Default bound for a single NAS exchange
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// HTTP client bound to one NAS base URL and TLS policy
#[derive(Clone)]
pub struct SynoClient {
    client: reqwest::Client,
    base_url: String,
    valid_cert: bool,
    timeout: Duration,
}

impl SynoClient {
    /// Create a client for `base_url`
    ///
    /// With `valid_cert == false` certificate validation is disabled, which
    /// is what self-signed NAS installs need.
    pub fn new(base_url: &str, valid_cert: bool, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!valid_cert)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            valid_cert,
            timeout: request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn valid_cert(&self) -> bool {
        self.valid_cert
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// `<base>/webapi/<path>`
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url,
            WEBAPI_PATH,
            path.trim_start_matches('/')
        )
    }

    fn request(
        &self,
        path: &str,
        params: &[(&str, &str)],
        session: Option<&SessionToken>,
    ) -> reqwest::RequestBuilder {
        let mut req = self.client.get(self.api_url(path)).query(params);
        if let Some(sid) = session {
            req = req.header(COOKIE, sid.cookie());
        }
        req
    }

    /// Run one bounded JSON exchange and unwrap the vendor envelope
    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        session: Option<&SessionToken>,
        what: &str,
    ) -> Result<T> {
        let url = self.api_url(path);

        tracing::debug!(url = %url, method = %what, "Synology API request");

        let exchange = async {
            let resp = self
                .request(path, params, session)
                .send()
                .await?
                .error_for_status()?;
            let body = resp.bytes().await?;
            let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
            Ok::<_, Error>(envelope)
        };

        match timeout(self.timeout, exchange).await {
            Ok(envelope) => envelope?.into_data(what),
            Err(_) => Err(Error::Timeout(url)),
        }
    }

    /// Resolve the Auth, Camera and Streaming API paths
    ///
    /// A timeout is reported as `PlatformUnavailable`; any other failure
    /// (bad JSON, missing API) is returned as-is. Both abort setup.
    pub async fn discover(&self) -> Result<EndpointMap> {
        let params = [
            ("api", QUERY_API),
            ("method", "Query"),
            ("version", "1"),
            ("query", "SYNO."),
        ];

        let info: HashMap<String, ApiInfo> = self
            .call(QUERY_CGI, &params, None, "Query")
            .await
            .map_err(|e| match e {
                Error::Timeout(url) => {
                    tracing::error!(url = %url, "Timeout on API discovery");
                    Error::PlatformUnavailable(format!("timeout on {}", url))
                }
                other => other,
            })?;

        let endpoints = EndpointMap::from_info(&info)?;

        for (api, version) in [
            (AUTH_API, AUTH_VERSION),
            (CAMERA_API, CAMERA_VERSION),
            (STREAMING_API, STREAMING_VERSION),
        ] {
            if let Some(entry) = info.get(api).filter(|entry| !entry.supports(version)) {
                tracing::warn!(
                    api = %api,
                    requested = version,
                    min_version = ?entry.min_version,
                    max_version = ?entry.max_version,
                    "Requested API version not advertised by the NAS"
                );
            }
        }

        tracing::info!(
            auth = %endpoints.auth,
            camera = %endpoints.camera,
            streaming = %endpoints.streaming,
            "Synology API paths resolved"
        );

        Ok(endpoints)
    }

    /// Log in and return the session id
    ///
    /// Never fails outward: timeout, transport error, malformed body and a
    /// rejected login all come back as `None` ("no session available").
    pub async fn login(
        &self,
        auth_path: &str,
        credentials: &Credentials,
    ) -> Option<SessionToken> {
        let version = AUTH_VERSION.to_string();
        let params = [
            ("api", AUTH_API),
            ("method", "Login"),
            ("version", version.as_str()),
            ("account", credentials.username.as_str()),
            ("passwd", credentials.password.as_str()),
            ("session", SESSION_NAME),
            ("format", "sid"),
        ];

        match self.call::<LoginData>(auth_path, &params, None, "Login").await {
            Ok(data) if !data.sid.is_empty() => Some(SessionToken::new(data.sid)),
            Ok(_) => {
                tracing::warn!(username = %credentials.username, "Login returned an empty sid");
                None
            }
            Err(Error::Timeout(url)) => {
                tracing::error!(url = %url, "Timeout on login");
                None
            }
            Err(e) => {
                tracing::error!(
                    username = %credentials.username,
                    error = %e,
                    "Login failed"
                );
                None
            }
        }
    }

    /// List cameras known to the NAS, in NAS order
    ///
    /// A timeout is `PlatformUnavailable`; a body that is not a camera list
    /// is `Api`. Both abort setup.
    pub async fn list_cameras(
        &self,
        camera_path: &str,
        session: &SessionToken,
    ) -> Result<Vec<CameraDescriptor>> {
        let version = CAMERA_VERSION.to_string();
        let params = [
            ("api", CAMERA_API),
            ("method", "List"),
            ("version", version.as_str()),
        ];

        let data: CameraListData = self
            .call(camera_path, &params, Some(session), "List")
            .await
            .map_err(|e| match e {
                Error::Timeout(url) => {
                    tracing::error!(url = %url, "Timeout on camera list");
                    Error::PlatformUnavailable(format!("timeout on {}", url))
                }
                Error::Serialization(e) => Error::Api(format!("malformed camera list: {}", e)),
                other => other,
            })?;

        Ok(data.cameras)
    }

    /// Fetch one still image
    ///
    /// `Ok(None)` on timeout. A JSON body instead of an image means the NAS
    /// rejected the call (expired session, unknown camera) and is an error.
    pub async fn get_snapshot(
        &self,
        camera_path: &str,
        camera_id: &str,
        session: &SessionToken,
    ) -> Result<Option<Snapshot>> {
        let url = self.api_url(camera_path);
        let version = CAMERA_VERSION.to_string();
        let params = [
            ("api", CAMERA_API),
            ("method", "GetSnapshot"),
            ("version", version.as_str()),
            ("cameraId", camera_id),
        ];

        let exchange = async {
            let resp = self
                .request(camera_path, &params, Some(session))
                .send()
                .await?
                .error_for_status()?;

            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(DEFAULT_SNAPSHOT_CONTENT_TYPE)
                .to_string();

            let body = resp.bytes().await?;

            if content_type.starts_with("application/json") {
                let envelope: ApiResponse<serde_json::Value> = serde_json::from_slice(&body)?;
                envelope.into_data("GetSnapshot")?;
            }

            Ok::<_, Error>(Snapshot {
                content_type,
                data: body,
            })
        };

        match timeout(self.timeout, exchange).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                tracing::error!(url = %url, camera_id = %camera_id, "Timeout on snapshot");
                Ok(None)
            }
        }
    }

    /// Open the MJPEG stream; only connect + response headers are bounded
    ///
    /// A connect timeout becomes `GatewayTimeout` so the host can answer 504.
    pub async fn open_stream(
        &self,
        streaming_path: &str,
        camera_id: &str,
        session: &SessionToken,
    ) -> Result<reqwest::Response> {
        let url = self.api_url(streaming_path);
        let version = STREAMING_VERSION.to_string();
        let params = [
            ("api", STREAMING_API),
            ("method", "Stream"),
            ("version", version.as_str()),
            ("cameraId", camera_id),
            ("format", "mjpeg"),
        ];

        let send = self.request(streaming_path, &params, Some(session)).send();

        match timeout(self.timeout, send).await {
            Ok(resp) => Ok(resp?.error_for_status()?),
            Err(_) => {
                tracing::warn!(url = %url, camera_id = %camera_id, "Timeout connecting to stream");
                Err(Error::GatewayTimeout(url))
            }
        }
    }
}

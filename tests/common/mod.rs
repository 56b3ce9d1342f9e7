//! Mock Surveillance Station NAS for end-to-end tests

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use syno_camserver::platform::{PlatformConfig, WhitelistMode};

pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=--myboundary";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "s3cret";

/// Per-endpoint delays and payload switches
#[derive(Default, Clone)]
pub struct MockOptions {
    pub query_delay: Duration,
    pub auth_delay: Duration,
    pub list_delay: Duration,
    pub snapshot_delay: Duration,
    pub stream_delay: Duration,
    /// Replace the discovery `data` object
    pub query_data: Option<Value>,
    /// Answer List with a body that is not a camera list
    pub malformed_list: bool,
    /// Login attempts (1-based, in arrival order) to reject
    pub fail_login_numbers: Vec<usize>,
    /// Content type of snapshot responses (default `image/jpeg`)
    pub snapshot_content_type: Option<String>,
    /// Stream chunk sizes sent by the NAS
    pub stream_chunks: Vec<usize>,
}

#[derive(Default)]
pub struct MockNas {
    pub options: MockOptions,
    pub login_attempts: AtomicUsize,
    pub logins: AtomicUsize,
    pub snapshots: AtomicUsize,
    pub streams: AtomicUsize,
    /// sids issued, in order
    pub issued: Mutex<Vec<String>>,
    /// (cameraId, cookie) seen on GetSnapshot
    pub snapshot_cookies: Mutex<Vec<(String, String)>>,
}

impl MockNas {
    fn cookie_valid(&self, headers: &HeaderMap) -> Option<String> {
        let cookie = headers.get(header::COOKIE)?.to_str().ok()?.to_string();
        let sid = cookie.strip_prefix("id=")?;
        let issued = self.issued.lock().unwrap();
        issued.iter().any(|s| s == sid).then_some(cookie)
    }
}

fn vendor_error(code: i64) -> Response {
    Json(json!({"success": false, "error": {"code": code}})).into_response()
}

async fn query_cgi(
    State(nas): State<Arc<MockNas>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    tokio::time::sleep(nas.options.query_delay).await;

    if params.get("api").map(String::as_str) != Some("SYNO.API.Info") {
        return vendor_error(102);
    }

    let data = nas.options.query_data.clone().unwrap_or_else(|| {
        json!({
            "SYNO.API.Auth": {"path": "auth.cgi", "minVersion": 1, "maxVersion": 6},
            "SYNO.SurveillanceStation.Camera": {"path": "camera.cgi"},
            "SYNO.SurveillanceStation.VideoStream": {"path": "SurveillanceStation/videoStreaming.cgi"}
        })
    });

    Json(json!({"data": data, "success": true})).into_response()
}

async fn auth_cgi(
    State(nas): State<Arc<MockNas>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    tokio::time::sleep(nas.options.auth_delay).await;

    let ok = params.get("method").map(String::as_str) == Some("Login")
        && params.get("version").map(String::as_str) == Some("2")
        && params.get("session").map(String::as_str) == Some("SurveillanceStation")
        && params.get("format").map(String::as_str) == Some("sid")
        && params.get("account").map(String::as_str) == Some(USERNAME)
        && params.get("passwd").map(String::as_str) == Some(PASSWORD);

    if !ok {
        return vendor_error(400);
    }

    let attempt = nas.login_attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if nas.options.fail_login_numbers.contains(&attempt) {
        return vendor_error(407);
    }

    let n = nas.logins.fetch_add(1, Ordering::SeqCst) + 1;
    let sid = format!("sid-{}", n);
    nas.issued.lock().unwrap().push(sid.clone());

    Json(json!({"data": {"sid": sid}, "success": true})).into_response()
}

async fn camera_cgi(
    State(nas): State<Arc<MockNas>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let Some(cookie) = nas.cookie_valid(&headers) else {
        return vendor_error(105);
    };

    match params.get("method").map(String::as_str) {
        Some("List") => {
            tokio::time::sleep(nas.options.list_delay).await;
            if nas.options.malformed_list {
                return Json(json!({
                    "success": true,
                    "data": {"cameras": [{"name": "No Id"}]}
                }))
                .into_response();
            }
            Json(json!({
                "success": true,
                "data": {
                    "total": 2,
                    "cameras": [
                        {"id": 1, "name": "Front Door", "snapshot_path": "/webapi/entry.cgi?cam=1", "model": "DCS-8000LH", "vendor": "D-Link", "enabled": true},
                        {"id": 2, "name": "Garden", "snapshot_path": "/webapi/entry.cgi?cam=2"}
                    ]
                }
            }))
            .into_response()
        }
        Some("GetSnapshot") => {
            tokio::time::sleep(nas.options.snapshot_delay).await;
            let camera_id = params.get("cameraId").cloned().unwrap_or_default();
            let n = nas.snapshots.fetch_add(1, Ordering::SeqCst) + 1;
            nas.snapshot_cookies
                .lock()
                .unwrap()
                .push((camera_id.clone(), cookie));

            let mut image = vec![0xFF, 0xD8];
            image.extend_from_slice(format!("cam{}-shot{}", camera_id, n).as_bytes());
            image.extend_from_slice(&[0xFF, 0xD9]);

            let content_type = nas
                .options
                .snapshot_content_type
                .clone()
                .unwrap_or_else(|| "image/jpeg".to_string());

            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], image).into_response()
        }
        _ => vendor_error(103),
    }
}

async fn streaming_cgi(
    State(nas): State<Arc<MockNas>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    tokio::time::sleep(nas.options.stream_delay).await;

    if nas.cookie_valid(&headers).is_none() {
        return vendor_error(105);
    }
    if params.get("method").map(String::as_str) != Some("Stream")
        || params.get("format").map(String::as_str) != Some("mjpeg")
    {
        return vendor_error(103);
    }

    nas.streams.fetch_add(1, Ordering::SeqCst);

    let chunks: Vec<Result<Bytes, std::io::Error>> = nas
        .options
        .stream_chunks
        .iter()
        .enumerate()
        .map(|(i, &n)| Ok(Bytes::from(vec![i as u8; n])))
        .collect();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, MJPEG_CONTENT_TYPE)],
        Body::from_stream(futures::stream::iter(chunks)),
    )
        .into_response()
}

/// Start a mock NAS on loopback; returns its base URL
pub async fn start_mock_nas(options: MockOptions) -> (String, Arc<MockNas>) {
    let nas = Arc::new(MockNas {
        options,
        ..Default::default()
    });

    let app = Router::new()
        .route("/webapi/query.cgi", get(query_cgi))
        .route("/webapi/auth.cgi", get(auth_cgi))
        .route("/webapi/camera.cgi", get(camera_cgi))
        .route(
            "/webapi/SurveillanceStation/videoStreaming.cgi",
            get(streaming_cgi),
        )
        .with_state(nas.clone());

    let base = serve(app).await;
    (format!("http://{}", base), nas)
}

/// Serve a router on an ephemeral loopback port
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn platform_config(url: &str) -> PlatformConfig {
    PlatformConfig {
        name: "Test NAS".to_string(),
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
        url: url.to_string(),
        whitelist: Vec::new(),
        valid_cert: true,
        whitelist_mode: WhitelistMode::Legacy,
        timeout_secs: 1,
    }
}

//! Error handling for the Synology camera proxy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No usable session for an authenticated call
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Setup could not reach the NAS in time
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),

    /// Upstream did not answer a stream request in time
    #[error("Gateway timeout: {0}")]
    GatewayTimeout(String),

    /// A bounded NAS request ran past its deadline
    #[error("Timeout on {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Vendor API returned something unusable
    #[error("API error: {0}")]
    Api(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status and machine-readable code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Error::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Error::PlatformUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PLATFORM_UNAVAILABLE")
            }
            Error::GatewayTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "GATEWAY_TIMEOUT"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            Error::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Error::Api(_) => (StatusCode::BAD_GATEWAY, "API_ERROR"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();
        let message = self.to_string();

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}

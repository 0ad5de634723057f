//! Gateway error types and the JSON error envelope.
//!
//! Every request-level failure is rendered as `{"message": ..., "code": ...}`
//! with a matching HTTP status.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Stable machine-readable error codes
pub mod codes {
    pub const URL_REQUIRED: &str = "url_required";
    pub const INVALID_URL: &str = "invalid_url";
    pub const NO_VIDEO_URL_FOUND: &str = "no_video_url_found";
    pub const NOT_FOUND: &str = "not_found";
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_API_KEY: &str = "invalid_api_key";
    pub const INVALID_HOST: &str = "invalid_host";
    pub const REQUEST_TIMEOUT: &str = "request_timeout";
    pub const EXTRACTION_TIMEOUT: &str = "extraction_timeout";
    pub const EXTRACTOR_UNAVAILABLE: &str = "extractor_unavailable";
    pub const INTERNAL_SERVER_ERROR: &str = "internal_server_error";
}

/// Request-level error with HTTP status and error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status returned to the client
    pub status: StatusCode,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl Default for ApiError {
    fn default() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: codes::INTERNAL_SERVER_ERROR.to_string(),
            message: "Unexpected error!".to_string(),
        }
    }
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// `url` query parameter missing or empty
    pub fn url_required() -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::URL_REQUIRED, "URL is required")
    }

    /// `url` query parameter is not an http(s) URL
    pub fn invalid_url() -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_URL, "Invalid URL")
    }

    /// Extractor succeeded but produced no direct link
    pub fn no_video_url() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::NO_VIDEO_URL_FOUND,
            "No video URL found",
        )
    }

    /// Unknown route
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Not found")
    }

    /// Known route, wrong HTTP method
    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            codes::METHOD_NOT_ALLOWED,
            "Method not allowed",
        )
    }

    /// Request could not be parsed
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, details)
    }

    /// Missing or unknown `api_key`
    pub fn invalid_api_key() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::INVALID_API_KEY,
            "Forbidden: Invalid or missing API key",
        )
    }

    /// `Host` header not in the trusted host list
    pub fn invalid_host() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_HOST,
            "Invalid host header",
        )
    }

    /// Whole-request deadline exceeded
    pub fn timeout(limit: Duration) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            codes::REQUEST_TIMEOUT,
            format!("Request exceeded {}s timeout", limit.as_secs()),
        )
    }

    /// Internal error
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL_SERVER_ERROR,
            details,
        )
    }

    fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            message: &self.message,
            code: &self.code,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: &'a str,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.body().serialize(serializer)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self.body()).unwrap_or_default();
        let mut response = Response::new(axum::body::Body::from(body));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures of the external link extractor
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Extractor executable is not installed
    #[error("extractor not installed: {0}")]
    NotInstalled(String),

    /// Extractor could not be started
    #[error("failed to start extractor: {0}")]
    Spawn(#[source] std::io::Error),

    /// Extractor did not finish in time
    #[error("extraction timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Extractor reported an error for this URL
    #[error("{message}")]
    Failed { message: String },

    /// Extractor output was not the expected JSON document
    #[error("malformed extractor output: {0}")]
    MalformedOutput(#[from] serde_json::Error),
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        match &e {
            ExtractError::NotInstalled(_) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::EXTRACTOR_UNAVAILABLE,
                "Extractor is not available",
            ),
            ExtractError::Timeout(limit) => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::EXTRACTION_TIMEOUT,
                format!("Extraction exceeded {}s timeout", limit.as_secs()),
            ),
            // Client-facing contract: yt-dlp's own error text, generic code
            ExtractError::Failed { message } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INTERNAL_SERVER_ERROR,
                message.as_str(),
            ),
            ExtractError::Spawn(_) | ExtractError::MalformedOutput(_) => {
                tracing::error!(error = %e, "Link extraction failed unexpectedly");
                ApiError::default()
            }
        }
    }
}

/// Gateway-level errors (startup and serving, not sent to clients)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Server socket bind error
    #[error("server bind error on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while serving
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be initialized
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

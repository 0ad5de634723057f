//! Middleware stack for the link gateway.
//!
//! Layer order: Request → Tracing → CORS → TrustedHost → ApiKey → Timeout → Handler

pub mod api_key;
pub mod cors;
pub mod timeout;
pub mod tracing;
pub mod trusted_host;

pub use api_key::{constant_time_compare, ApiKeyLayer};
pub use cors::create_cors_layer;
pub use timeout::TimeoutLayer;
pub use tracing::TracingLayer;
pub use trusted_host::{HostMatcher, TrustedHostLayer};

use crate::domain::config::GatewayConfig;
use axum::http::Uri;
use tower_http::cors::CorsLayer;

/// Middleware stack builder
#[derive(Clone)]
pub struct MiddlewareStack {
    pub tracing: TracingLayer,
    pub cors: CorsLayer,
    pub trusted_host: TrustedHostLayer,
    pub api_key: ApiKeyLayer,
    pub timeout: TimeoutLayer,
}

impl MiddlewareStack {
    /// Create middleware stack from gateway config
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            tracing: TracingLayer::new(),
            cors: create_cors_layer(&config.cors),
            trusted_host: TrustedHostLayer::new(&config.hosts),
            api_key: ApiKeyLayer::new(config.auth.clone()),
            timeout: TimeoutLayer::new(&config.timeouts),
        }
    }
}

/// Decoded query string pairs, in order
pub(crate) fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Last decoded value of a query parameter
pub(crate) fn query_param(uri: &Uri, name: &str) -> Option<String> {
    uri.query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .filter(|(key, _)| key == name)
            .last()
            .map(|(_, value)| value.into_owned())
    })
}

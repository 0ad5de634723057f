//! CORS middleware.
//!
//! Wrapper around tower-http CORS with gateway configuration.

use crate::domain::config::CorsConfig;
use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

/// Create CORS layer from gateway config
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        // No allowed origin: no CORS headers are ever emitted
        return CorsLayer::new();
    }

    // A literal `*` cannot be combined with credentials, so wildcards
    // mirror the request instead.
    let credentials = config.allow_credentials;
    let mut cors = CorsLayer::new();

    // Configure origins
    if is_wildcard(&config.allowed_origins) {
        cors = if credentials {
            cors.allow_origin(AllowOrigin::mirror_request())
        } else {
            cors.allow_origin(Any)
        };
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if is_wildcard(&config.allowed_methods) {
        cors = if credentials {
            cors.allow_methods(AllowMethods::mirror_request())
        } else {
            cors.allow_methods(Any)
        };
    } else {
        let methods: Vec<Method> = config
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if is_wildcard(&config.allowed_headers) {
        cors = if credentials {
            cors.allow_headers(AllowHeaders::mirror_request())
        } else {
            cors.allow_headers(Any)
        };
    } else {
        let headers: Vec<HeaderName> = config
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors = cors.max_age(Duration::from_secs(config.max_age));

    if credentials {
        cors = cors.allow_credentials(true);
    }

    cors
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

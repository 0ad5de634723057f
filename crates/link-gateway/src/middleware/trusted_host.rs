//! Trusted host middleware.
//!
//! Rejects requests whose `Host` does not match the configured patterns.

use crate::domain::config::TrustedHostConfig;
use crate::ApiError;
use axum::{
    body::Body,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// Compiled host patterns
#[derive(Debug, Clone)]
pub struct HostMatcher {
    allow_any: bool,
    patterns: Vec<String>,
}

impl HostMatcher {
    pub fn new(config: &TrustedHostConfig) -> Self {
        Self {
            allow_any: config.allowed_hosts.iter().any(|h| h == "*"),
            patterns: config
                .allowed_hosts
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
        }
    }

    /// `*` matches any host, `*.example.com` matches subdomains of example.com.
    /// Any other pattern, including `*example.com`, is an exact match.
    pub fn is_allowed(&self, host: &str) -> bool {
        if self.allow_any {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| {
            if pattern.starts_with("*.") {
                // keep the leading dot so "*.foo.com" never matches "evilfoo.com"
                host.ends_with(&pattern[1..])
            } else {
                *pattern == host
            }
        })
    }
}

/// Trusted host layer
#[derive(Clone)]
pub struct TrustedHostLayer {
    matcher: Arc<HostMatcher>,
}

impl TrustedHostLayer {
    pub fn new(config: &TrustedHostConfig) -> Self {
        Self {
            matcher: Arc::new(HostMatcher::new(config)),
        }
    }
}

impl<S> Layer<S> for TrustedHostLayer {
    type Service = TrustedHostService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TrustedHostService {
            inner,
            matcher: Arc::clone(&self.matcher),
        }
    }
}

/// Trusted host service
#[derive(Clone)]
pub struct TrustedHostService<S> {
    inner: S,
    matcher: Arc<HostMatcher>,
}

impl<S> Service<Request<Body>> for TrustedHostService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let matcher = Arc::clone(&self.matcher);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let host = request_host(&req).unwrap_or_default();
            if !matcher.is_allowed(&host) {
                warn!(host = %host, "Rejected request with untrusted Host header");
                return Ok(ApiError::invalid_host().into_response());
            }

            inner.call(req).await
        })
    }
}

/// Host of the request without port, from the `Host` header or the URI authority
fn request_host<B>(req: &Request<B>) -> Option<String> {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))?;

    Some(strip_port(&raw).to_string())
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal, e.g. "[::1]:8080"
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

//! Request logging middleware.
//!
//! Wraps each request in a span with a request id and emits one access-log
//! event once the response status is known.

use super::query_pairs;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, Uri},
    response::Response,
};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

const REDACTED: &str = "[redacted]";

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

/// Tracing service
#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let entry = AccessEntry::from_request(&req);
        let span = info_span!(
            "http_request",
            request_id = %Uuid::now_v7(),
            http.method = %entry.method,
            http.target = %req.uri().path(),
        );

        Box::pin(
            async move {
                let result = inner.call(req).await;

                if let Ok(response) = &result {
                    info!(
                        timestamp = %entry.timestamp,
                        client_ip = %entry.client_ip,
                        method = %entry.method,
                        url = %entry.url,
                        query_params = ?entry.query_params,
                        status = response.status().as_u16(),
                        "request completed"
                    );
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Request details captured before the request is handed on
#[derive(Debug)]
struct AccessEntry {
    timestamp: String,
    client_ip: String,
    method: String,
    url: String,
    query_params: BTreeMap<String, String>,
}

impl AccessEntry {
    fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            client_ip: client_ip(req),
            method: req.method().to_string(),
            url: full_url(req),
            query_params: redacted_pairs(req.uri()).into_iter().collect(),
        }
    }
}

/// Peer IP from connect info, or `unknown` when served without it
fn client_ip<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Query pairs with the API key value masked
fn redacted_pairs(uri: &Uri) -> Vec<(String, String)> {
    query_pairs(uri)
        .into_iter()
        .map(|(key, value)| match key.as_str() {
            "api_key" => (key, REDACTED.to_string()),
            _ => (key, value),
        })
        .collect()
}

/// Absolute request URL with the API key masked, rebuilt from the `Host`
/// header for origin-form URIs
fn full_url<B>(req: &Request<B>) -> String {
    let uri = req.uri();

    let mut target = uri.path().to_string();
    if uri.query().is_some() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(redacted_pairs(uri))
            .finish();
        target.push('?');
        target.push_str(&query);
    }

    let authority = uri.authority().map(|a| a.as_str()).or_else(|| {
        req.headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
    });
    match authority {
        Some(authority) => {
            let scheme = uri.scheme_str().unwrap_or("http");
            format!("{}://{}{}", scheme, authority, target)
        }
        None => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_full_url_from_host_header() {
        let req = Request::builder()
            .uri("/v1/yt-dlp?url=x&api_key=k")
            .header("host", "localhost:8080")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            full_url(&req),
            "http://localhost:8080/v1/yt-dlp?url=x&api_key=%5Bredacted%5D"
        );
    }

    #[test]
    fn test_full_url_absolute_form() {
        let req = Request::builder()
            .uri("http://example.com/v1/yt-dlp")
            .body(Body::empty())
            .unwrap();
        assert_eq!(full_url(&req), "http://example.com/v1/yt-dlp");
    }

    #[test]
    fn test_client_ip() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), "unknown");

        req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)),
            51234,
        )));
        assert_eq!(client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn test_access_entry_query_params() {
        let req = Request::builder()
            .method("GET")
            .uri("/v1/yt-dlp?url=https%3A%2F%2Fexample.com%2Fv&api_key=k")
            .body(Body::empty())
            .unwrap();
        let entry = AccessEntry::from_request(&req);
        assert_eq!(entry.method, "GET");
        assert_eq!(
            entry.query_params.get("url").map(String::as_str),
            Some("https://example.com/v")
        );
        assert_eq!(
            entry.query_params.get("api_key").map(String::as_str),
            Some(REDACTED)
        );
        assert_eq!(entry.query_params.len(), 2);
    }
}

//! API key middleware.
//!
//! Every request must carry an `api_key` query parameter matching one of the
//! configured keys. CORS preflights never reach this layer.

use super::query_param;
use crate::domain::config::AuthConfig;
use crate::ApiError;
use axum::{body::Body, http::Request, response::IntoResponse, response::Response};
use std::sync::Arc;
use tower::{Layer, Service};
use tracing::warn;

/// API key layer
#[derive(Clone)]
pub struct ApiKeyLayer {
    config: Arc<AuthConfig>,
}

impl ApiKeyLayer {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for ApiKeyLayer {
    type Service = ApiKeyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// API key service
#[derive(Clone)]
pub struct ApiKeyService<S> {
    inner: S,
    config: Arc<AuthConfig>,
}

impl<S> Service<Request<Body>> for ApiKeyService<S>
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
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !check_api_key(&req, &config) {
                warn!(path = %req.uri().path(), "Rejected request with invalid or missing API key");
                return Ok(ApiError::invalid_api_key().into_response());
            }

            inner.call(req).await
        })
    }
}

/// Check the `api_key` query parameter against the configured keys
fn check_api_key<B>(req: &Request<B>, config: &AuthConfig) -> bool {
    let Some(provided) = query_param(req.uri(), "api_key") else {
        return false;
    };
    if provided.is_empty() {
        return false;
    }

    // Compare against every key so timing does not reveal which one matched
    config
        .api_keys
        .iter()
        .fold(false, |matched, key| {
            constant_time_compare(&provided, key) | matched
        })
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    // Different pad bytes guarantee a mismatch when lengths differ
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(keys: &[&str]) -> AuthConfig {
        AuthConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "Secret"));
        assert!(!constant_time_compare("secret", "secre"));
        assert!(!constant_time_compare("secret", "secrets"));
    }

    #[test]
    fn test_valid_key() {
        let config = config(&["k1", "k2"]);
        assert!(check_api_key(&request("/v1/yt-dlp?api_key=k2&url=x"), &config));
    }

    #[test]
    fn test_unknown_key() {
        let config = config(&["k1"]);
        assert!(!check_api_key(&request("/v1/yt-dlp?api_key=nope"), &config));
    }

    #[test]
    fn test_missing_key() {
        let config = config(&["k1"]);
        assert!(!check_api_key(&request("/v1/yt-dlp?url=x"), &config));
        assert!(!check_api_key(&request("/v1/yt-dlp"), &config));
    }

    #[test]
    fn test_empty_key_never_matches() {
        // An empty entry must not authorize `?api_key=`
        let config = config(&[""]);
        assert!(!check_api_key(&request("/?api_key="), &config));
    }

    #[test]
    fn test_no_keys_configured_rejects_all() {
        let config = config(&[]);
        assert!(!check_api_key(&request("/?api_key=anything"), &config));
    }

    #[test]
    fn test_percent_encoded_key() {
        let config = config(&["a b+c"]);
        assert!(check_api_key(&request("/?api_key=a%20b%2Bc"), &config));
    }
}

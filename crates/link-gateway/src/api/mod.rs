//! HTTP handlers and route table.

pub mod links;

use crate::ports::LinkExtractor;
use crate::ApiError;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Route serving direct-link resolution
pub const LINK_ROUTE: &str = "/v1/yt-dlp";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn LinkExtractor>,
}

/// Route table without middleware
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            LINK_ROUTE,
            get(links::get_download_link).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

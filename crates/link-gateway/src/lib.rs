//! Link Gateway - HTTP API resolving direct media links through yt-dlp.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 LINK GATEWAY (port 8080)                  │
//! ├──────────────────────────────────────────────────────────┤
//! │  Middleware Stack                                         │
//! │  Tracing → CORS → TrustedHost → ApiKey → Timeout          │
//! │                         │                                 │
//! │              GET /v1/yt-dlp?url=&api_key=                 │
//! │                         │                                 │
//! │              LinkExtractor (port)                         │
//! └─────────────────────────┼────────────────────────────────┘
//!                           │
//!                  yt-dlp child process
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use link_gateway::{GatewayConfig, LinkGatewayService, YtDlpExtractor};
//! use std::sync::Arc;
//!
//! let config = GatewayConfig::load(None)?;
//! let extractor = Arc::new(YtDlpExtractor::locate(&config.extractor));
//! LinkGatewayService::new(config, extractor)?.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod api;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod service;
pub mod telemetry;

// Re-exports for public API
pub use adapters::YtDlpExtractor;
pub use domain::config::{GatewayConfig, DEFAULT_PORT};
pub use domain::error::{ApiError, ApiResult, ExtractError, GatewayError};
pub use domain::types::*;
pub use ports::LinkExtractor;
pub use service::LinkGatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

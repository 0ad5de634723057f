//! Domain types for the link gateway.
//!
//! Configuration, error envelopes and request/response shapes.

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig, DEFAULT_PORT};
pub use error::{ApiError, ApiResult, ExtractError, GatewayError};
pub use types::*;

//! Outbound ports for the link gateway.

use crate::domain::{ExtractError, ExtractedMedia};
use async_trait::async_trait;
use url::Url;

/// Resolves a page URL to a direct media link
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn extract(&self, url: &Url) -> Result<ExtractedMedia, ExtractError>;
}

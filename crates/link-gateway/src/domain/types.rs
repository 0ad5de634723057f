//! Request and response types for the link API.

use serde::{Deserialize, Serialize};

/// Maximum accepted length of a page URL
pub const MAX_URL_LENGTH: usize = 2083;

/// Result of a successful extraction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedMedia {
    /// Direct media URL (may be empty when the extractor found none)
    #[serde(default)]
    pub url: String,
    /// Media title, if reported
    #[serde(default)]
    pub title: Option<String>,
    /// Name of the site extractor that handled the page
    #[serde(default)]
    pub extractor: Option<String>,
}

impl ExtractedMedia {
    /// Direct link, or `None` when empty
    pub fn direct_url(&self) -> Option<&str> {
        let url = self.url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// Query string of `GET /v1/yt-dlp`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkQuery {
    /// Page URL to resolve
    pub url: Option<String>,
}

impl LinkQuery {
    /// Build from decoded query pairs; a repeated `url` resolves to its last value
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            url: pairs
                .into_iter()
                .filter(|(key, _)| key == "url")
                .map(|(_, value)| value)
                .last(),
        }
    }
}

/// Payload of a successful link response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub url: String,
}

/// Success envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub code: String,
    pub message: String,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            code: "success".to_string(),
            message: "Request was successful".to_string(),
        }
    }
}

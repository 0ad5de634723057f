//! `GET /v1/yt-dlp`: resolve a page URL to its direct media link.

use super::AppState;
use crate::domain::error::ApiResult;
use crate::domain::types::{LinkData, LinkQuery, SuccessResponse, MAX_URL_LENGTH};
use crate::ApiError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use tracing::info;
use url::Url;

/// Handler for `GET /v1/yt-dlp?url=...`
pub async fn get_download_link(
    State(state): State<AppState>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<SuccessResponse<LinkData>>> {
    let Query(pairs) = pairs.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let query = LinkQuery::from_pairs(pairs);
    let page = parse_page_url(query.url.as_deref())?;

    let media = state.extractor.extract(&page).await?;
    let direct = media.direct_url().ok_or_else(ApiError::no_video_url)?;

    info!(
        page = %page,
        extractor = media.extractor.as_deref().unwrap_or("unknown"),
        "Resolved direct link"
    );

    Ok(Json(SuccessResponse::new(LinkData {
        url: direct.to_string(),
    })))
}

/// Validate the `url` parameter as an absolute http(s) URL with a host
pub fn parse_page_url(raw: Option<&str>) -> ApiResult<Url> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ApiError::url_required());
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(ApiError::invalid_url());
    }

    let url = Url::parse(raw).map_err(|_| ApiError::invalid_url())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::invalid_url());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ApiError::invalid_url()),
    }
}

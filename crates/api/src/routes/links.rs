//! Canonical link assembly for the platform's view layer

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::routing::pattern::Params;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SiteUrlRequest {
    pub site_slug: String,
    /// Route relative to the site root; empty for the root itself
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub params: Params,
    /// Defaults to the configured scheme
    #[serde(default)]
    pub scheme: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SiteUrlResponse {
    pub url: String,
}

/// Build the domain-relative URL of a site route
pub async fn site_url(
    State(state): State<AppState>,
    Json(request): Json<SiteUrlRequest>,
) -> ApiResult<Json<SiteUrlResponse>> {
    let scheme = request
        .scheme
        .as_deref()
        .unwrap_or(&state.config.default_scheme);

    let url = state
        .resolver
        .site_url(&request.site_slug, &request.route, &request.params, scheme)
        .await
        .ok_or(ApiError::NotFound)?;
    Ok(Json(SiteUrlResponse { url }))
}

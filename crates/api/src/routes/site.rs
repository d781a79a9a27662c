//! Site request handling
//!
//! Every request that is not an operational or admin route lands here and
//! is resolved against the domain mappings. The response is an instruction
//! for the host platform: a redirect, or the route to dispatch. Platform
//! routes are only dispatched for unmapped hosts and excluded paths; a mapped
//! domain never serves anything outside its own site table.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ApiError;
use crate::routing::{PassthroughReason, RequestContext, Resolution};
use crate::state::AppState;

pub async fn resolve_request(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let request = RequestContext::from_http(&headers, &uri, &state.config.default_scheme);

    match state.resolver.resolve(&request).await {
        Resolution::Redirect(location) => redirect(location, state.config.permanent_redirects),
        Resolution::Serve(found) => (StatusCode::OK, Json(found)).into_response(),
        Resolution::Passthrough(PassthroughReason::Unmatched) => ApiError::NotFound.into_response(),
        Resolution::Passthrough(reason) => match state.registry.match_static(&request.path) {
            Some(found) => (StatusCode::OK, Json(found)).into_response(),
            None if reason == PassthroughReason::Unmapped => ApiError::DomainNotConfigured.into_response(),
            None => ApiError::NotFound.into_response(),
        },
    }
}

fn redirect(location: String, permanent: bool) -> Response {
    let status = if permanent {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::FOUND
    };
    (status, [(header::LOCATION, location)]).into_response()
}

//! Admin token authentication
//!
//! The mapping administration routes are called by the platform's admin UI
//! with a shared bearer token.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        // Same amount of work for a length mismatch
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Reject requests without `Authorization: Bearer <ADMIN_TOKEN>`
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthorized)?;

    if !constant_time_compare(provided, &state.config.admin_token) {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request with invalid token");
        return Err(ApiError::InvalidToken);
    }

    Ok(next.run(request).await)
}

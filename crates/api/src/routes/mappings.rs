//! Domain mapping administration
//!
//! Called by the platform's admin UI: one listing of every site with its
//! domain, and one batch endpoint that applies the edited table.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use sitehost_shared::MappingListing;

use crate::error::ApiResult;
use crate::mappings::{ReconcileReport, ReconcileRow};
use crate::state::AppState;

/// List every site with its domain mapping, if any
pub async fn list_mappings(State(state): State<AppState>) -> ApiResult<Json<Vec<MappingListing>>> {
    let listing = state.store.list().await?;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub rows: Vec<ReconcileRow>,
}

/// Apply a batch of mapping edits.
///
/// Returns 200 when every row was applied and 422 when any row was rejected;
/// the body is the same report either way.
pub async fn reconcile_mappings(
    State(state): State<AppState>,
    Json(request): Json<ReconcileRequest>,
) -> (StatusCode, Json<ReconcileReport>) {
    let report = state.reconciler.reconcile(&request.rows).await;

    if report.has_commits() {
        // Cached bindings, including cached misses, may be stale now
        state.resolver.clear_cache();
    }

    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(report))
}

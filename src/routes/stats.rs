//! Statistics endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::stats::compute_outreach_stats;
use crate::ApiState;

/// Statistics route
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/", get(get_stats))
}

/// Aggregate outreach statistics
#[utoipa::path(
    get,
    path = "/api/outreach/stats",
    responses(
        (status = 200, description = "Counts and rates across all campaigns", body = StatsResponse)
    ),
    tag = "outreach",
    security(("bearer" = []))
)]
pub async fn get_stats(_user: AuthUser, State(state): State<Arc<ApiState>>) -> Json<StatsResponse> {
    let data = state.store.load().await;
    Json(StatsResponse {
        stats: compute_outreach_stats(&data),
    })
}

//! Batch sending endpoint

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::error::OutreachResult;
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::routes::json_body;
use crate::ApiState;

/// Batch sending route
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/", post(send_batch))
}

/// Send invitations to a campaign's pending contacts
#[utoipa::path(
    post,
    path = "/api/outreach/send-batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch outcome, including per-contact failures", body = BatchReport),
        (status = 400, description = "Missing campaign_id"),
        (status = 503, description = "Generation service not configured")
    ),
    tag = "outreach",
    security(("bearer" = []))
)]
pub async fn send_batch(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> OutreachResult<Json<BatchReport>> {
    let request = json_body(payload)?;
    tracing::info!(user = %user.id, campaign_id = ?request.campaign_id, "batch requested");
    Ok(Json(state.batch.send_batch(request).await?))
}

//! Campaign endpoints

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::campaigns::{create_campaign, list_campaigns};
use crate::error::OutreachResult;
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::routes::json_body;
use crate::ApiState;

/// Campaign routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/", get(list).post(create))
}

/// List campaigns with live statistics
#[utoipa::path(
    get,
    path = "/api/outreach/campaigns",
    responses(
        (status = 200, description = "All campaigns", body = CampaignList),
        (status = 401, description = "Authentication required")
    ),
    tag = "campaigns",
    security(("bearer" = []))
)]
pub async fn list(_user: AuthUser, State(state): State<Arc<ApiState>>) -> Json<CampaignList> {
    Json(CampaignList {
        campaigns: list_campaigns(&state.store).await,
    })
}

/// Create a campaign and attach matching venues
#[utoipa::path(
    post,
    path = "/api/outreach/campaigns",
    request_body = CampaignCreate,
    responses(
        (status = 200, description = "Campaign created", body = CampaignCreated),
        (status = 400, description = "Missing name"),
        (status = 401, description = "Authentication required")
    ),
    tag = "campaigns",
    security(("bearer" = []))
)]
pub async fn create(
    user: AuthUser,
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CampaignCreate>, JsonRejection>,
) -> OutreachResult<Json<CampaignCreated>> {
    let input = json_body(payload)?;
    let created = create_campaign(&state.store, state.venues.as_ref(), input).await?;
    tracing::debug!(user = %user.id, campaign_id = %created.campaign.id, "campaign created by operator");
    Ok(Json(created))
}

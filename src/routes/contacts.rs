//! Contact endpoints

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::contacts::{list_contacts, update_contact};
use crate::error::{OutreachError, OutreachResult};
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::routes::json_body;
use crate::ApiState;

/// Contact routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/", get(list).patch(update))
}

/// Query of the contact listing
#[derive(Deserialize)]
pub struct ListParams {
    #[serde(rename = "campaignId")]
    campaign_id: Option<String>,
}

/// Contacts of one campaign
#[utoipa::path(
    get,
    path = "/api/outreach/contacts",
    params(("campaignId" = String, Query, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign contacts", body = ContactList),
        (status = 400, description = "Missing campaignId")
    ),
    tag = "contacts",
    security(("bearer" = []))
)]
pub async fn list(
    _user: AuthUser,
    State(state): State<Arc<ApiState>>,
    Query(params): Query<ListParams>,
) -> OutreachResult<Json<ContactList>> {
    let campaign_id = params
        .campaign_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| OutreachError::Validation("Le parametre campaignId est requis.".into()))?;

    Ok(Json(ContactList {
        contacts: list_contacts(&state.store, &campaign_id).await,
    }))
}

/// Update a contact's status, notes or follow-up fields
#[utoipa::path(
    patch,
    path = "/api/outreach/contacts",
    request_body = ContactUpdate,
    responses(
        (status = 200, description = "Updated contact", body = ContactResponse),
        (status = 400, description = "Missing ids or reserved status"),
        (status = 404, description = "Contact not found")
    ),
    tag = "contacts",
    security(("bearer" = []))
)]
pub async fn update(
    _user: AuthUser,
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ContactUpdate>, JsonRejection>,
) -> OutreachResult<Json<ContactResponse>> {
    let contact = update_contact(&state.store, json_body(payload)?).await?;
    Ok(Json(ContactResponse { contact }))
}

//! Single email generation endpoint

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::error::{OutreachError, OutreachResult};
use crate::generation::VenueContext;
use crate::middleware::auth::AuthUser;
use crate::models::*;
use crate::routes::json_body;
use crate::ApiState;

/// Single email generation route
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/", post(generate_email))
}

/// Generate one invitation email for preview
#[utoipa::path(
    post,
    path = "/api/outreach/generate-email",
    request_body = GenerateEmailRequest,
    responses(
        (status = 200, description = "Generated subject and body", body = GeneratedEmail),
        (status = 400, description = "Missing venue_name or form_url"),
        (status = 502, description = "Generation provider failed"),
        (status = 503, description = "Generation service not configured")
    ),
    tag = "outreach",
    security(("bearer" = []))
)]
pub async fn generate_email(
    _user: AuthUser,
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<GenerateEmailRequest>, JsonRejection>,
) -> OutreachResult<Json<GeneratedEmail>> {
    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| OutreachError::NotConfigured("Service IA non configure.".into()))?;

    let request = json_body(payload)?;
    let (Some(venue_name), Some(form_url)) = (
        request.venue_name.filter(|n| !n.is_empty()),
        request.form_url.filter(|u| !u.is_empty()),
    ) else {
        return Err(OutreachError::Validation(
            "venue_name et form_url sont requis.".into(),
        ));
    };

    let context = VenueContext {
        venue_id: request.venue_id.unwrap_or_default(),
        venue_name,
        description: request.venue_description.unwrap_or_default(),
        website: request.venue_website.unwrap_or_default(),
        form_url,
    };

    let email = generator.generate(&context).await.map_err(|e| {
        tracing::warn!(venue_id = %context.venue_id, error = %e, "email generation failed");
        OutreachError::Dependency("Erreur du service IA. Veuillez reessayer.".into())
    })?;
    Ok(Json(email))
}

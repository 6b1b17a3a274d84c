//! Public venue submission endpoints
//!
//! No operator identity here: the form token is the credential.

use std::sync::Arc;

use axum::extract::{rejection::JsonRejection, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::OutreachResult;
use crate::routes::json_body;
use crate::submissions::{self, SubmissionAccepted, SubmissionRequest, TokenValidation};
use crate::ApiState;

/// Public venue submission routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", post(submit))
        .route("/validate-token", get(validate_token))
}

/// Query of the token check
#[derive(Deserialize)]
pub struct TokenParams {
    token: Option<String>,
}

/// Check a form token
#[utoipa::path(
    get,
    path = "/api/venue-submission/validate-token",
    params(("token" = String, Query, description = "Form token from the invitation link")),
    responses(
        (status = 200, description = "Token status", body = TokenValidation),
        (status = 400, description = "Missing token", body = TokenValidation)
    ),
    tag = "venue-submission"
)]
pub async fn validate_token(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<TokenParams>,
) -> Response {
    match params.token.filter(|t| !t.is_empty()) {
        None => (
            StatusCode::BAD_REQUEST,
            Json(TokenValidation::rejected(Some("Token manquant."))),
        )
            .into_response(),
        Some(token) => Json(submissions::validate_token(&state.store, &token).await).into_response(),
    }
}

/// Submit the venue listing form
#[utoipa::path(
    post,
    path = "/api/venue-submission",
    request_body = SubmissionRequest,
    responses(
        (status = 200, description = "Submission recorded", body = SubmissionAccepted),
        (status = 400, description = "Missing token or invalid form"),
        (status = 403, description = "Unknown token"),
        (status = 409, description = "Form already submitted")
    ),
    tag = "venue-submission"
)]
pub async fn submit(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> OutreachResult<Json<SubmissionAccepted>> {
    let request = json_body(payload)?;
    let accepted = submissions::submit(&state.store, &state.submissions, request).await?;
    Ok(Json(accepted))
}

//! API Routes

pub mod campaigns;
pub mod contacts;
pub mod generate_email;
pub mod health;
pub mod send_batch;
pub mod stats;
pub mod venue_submission;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::{OutreachError, OutreachResult};

/// Unwrap a JSON body, answering 400 with the platform message on malformed input
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> OutreachResult<T> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::debug!(error = %e, "malformed request body");
        OutreachError::Validation("Corps de requete invalide.".into())
    })
}

//! Error types for the outreach API

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Outreach error type
#[derive(Error, Debug)]
pub enum OutreachError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Submitted form failed schema validation
    #[error("Donnees invalides.")]
    InvalidForm { details: Vec<String> },

    /// Missing or invalid identity
    #[error("{0}")]
    Unauthorized(String),

    /// Identity or token not allowed to act
    #[error("{0}")]
    Forbidden(String),

    /// No matching entity
    #[error("{0}")]
    NotFound(String),

    /// Duplicate or already processed
    #[error("{0}")]
    Conflict(String),

    /// Upstream provider failure (generation, mail delivery)
    #[error("{0}")]
    Dependency(String),

    /// Service credential absent
    #[error("{0}")]
    NotConfigured(String),

    /// Too many requests for this client
    #[error("Trop de requêtes. Veuillez réessayer dans une minute.")]
    RateLimited { retry_after_secs: u64 },

    /// Storage I/O failure
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the outreach API
pub type OutreachResult<T> = Result<T, OutreachError>;

impl OutreachError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidForm { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Dependency(_) => StatusCode::BAD_GATEWAY,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Io(_) | Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidForm { .. } => "invalid_form",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Dependency(_) => "dependency_error",
            Self::NotConfigured(_) => "not_configured",
            Self::RateLimited { .. } => "rate_limited",
            Self::Io(_) | Self::Json(_) => "internal_error",
        }
    }
}

/// Error body returned to clients
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for OutreachError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            // Internal details stay in the logs.
            Self::Io(_) | Self::Json(_) => {
                tracing::error!(error = %self, "request failed");
                "Une erreur interne est survenue.".to_string()
            }
            other => other.to_string(),
        };
        let details = match &self {
            Self::InvalidForm { details } => Some(details.clone()),
            _ => None,
        };
        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = (
            status,
            Json(ErrorBody {
                error,
                code: self.code(),
                details,
            }),
        )
            .into_response();

        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

//! Request gate
//!
//! Every `/api/` request is counted against its client's rate-limit window
//! first. A bearer identity, when present and valid, is then attached to the
//! request; routes classified as AI-backed refuse to go further without one.

pub mod auth;
pub mod rate_limit;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::OutreachError;
use crate::ApiState;
use auth::bearer_token;
use rate_limit::{client_ip, RouteClass};

/// Gate middleware, installed with `axum::middleware::from_fn_with_state`
pub async fn gate(State(state): State<Arc<ApiState>>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if !path.starts_with("/api/") {
        return next.run(req).await;
    }

    let ip = client_ip(req.headers());
    let class = state.rate_limiter.classify(&path);
    let outcome = state.rate_limiter.check(&ip, class);
    if !outcome.allowed {
        let retry_after_secs = outcome
            .retry_after
            .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
            .unwrap_or(0)
            .max(1);
        tracing::warn!(ip = %ip, path = %path, "rate limit exceeded");
        return OutreachError::RateLimited { retry_after_secs }.into_response();
    }

    let user = bearer_token(req.headers()).and_then(|token| state.auth.verify(token).ok());
    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
        }
        None if class == RouteClass::Ai => {
            return OutreachError::Unauthorized("Authentification requise".into()).into_response();
        }
        None => {}
    }

    next.run(req).await
}

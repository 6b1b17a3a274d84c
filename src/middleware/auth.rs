//! Identity
//!
//! Operators authenticate with a bearer JWT issued by the platform's auth
//! provider (HS256, shared secret). The gate verifies it once per request and
//! stores the resulting [`AuthUser`] in the request extensions.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::OutreachError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry, seconds since the epoch
    pub exp: usize,
    /// Audience
    pub aud: String,
}

/// Verified operator identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Subject of the token
    pub id: String,
    /// Email
    pub email: Option<String>,
    /// Role
    pub role: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

fn unauthorized() -> OutreachError {
    OutreachError::Unauthorized("Authentification requise".into())
}

/// `Authorization: Bearer <token>` value
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// JWT verifier; without a secret no token is ever accepted
pub struct AuthVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl AuthVerifier {
    /// Verifier for the configured secret; without one every token is rejected
    pub fn new(config: &AuthConfig) -> Self {
        let key = config
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| DecodingKey::from_secret(s.as_bytes()));
        if key.is_none() {
            tracing::warn!("no JWT secret configured, operator routes will reject every request");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&config.audience]);

        Self { key, validation }
    }

    /// Verify a bearer token
    pub fn verify(&self, token: &str) -> Result<AuthUser, OutreachError> {
        let key = self.key.as_ref().ok_or_else(unauthorized)?;
        let data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            unauthorized()
        })?;
        Ok(data.claims.into())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = OutreachError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(unauthorized)
    }
}

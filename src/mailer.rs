//! Email delivery through the Gmail REST API

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::config::GmailConfig;
use crate::error::{OutreachError, OutreachResult};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GMAIL_PROFILE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/profile";
const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Refresh this long before the provider-announced expiry
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// One plain-text message
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    /// Recipient address
    pub to: String,
    /// Subject line, UTF-8
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Display name for the `From` header
    pub from_name: Option<String>,
}

/// Email delivery port
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message
    async fn send(&self, email: &OutgoingEmail) -> OutreachResult<()>;
}

/// RFC 2047 encoded-word for a UTF-8 header value
pub fn encode_header_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// RFC 822 message as sent to Gmail, before base64url encoding
pub fn build_message(from: &str, email: &OutgoingEmail) -> String {
    let from_header = match &email.from_name {
        Some(name) => format!("\"{name}\" <{from}>"),
        None => from.to_string(),
    };
    [
        format!("From: {from_header}"),
        format!("To: {}", email.to),
        format!("Subject: {}", encode_header_word(&email.subject)),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/plain; charset=UTF-8".to_string(),
        String::new(),
        email.body.clone(),
    ]
    .join("\r\n")
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(rename = "emailAddress")]
    email_address: String,
}

#[derive(Deserialize)]
struct GmailErrorBody {
    error: Option<GmailErrorDetail>,
}

#[derive(Deserialize)]
struct GmailErrorDetail {
    message: Option<String>,
}

/// Gmail sender using an OAuth refresh token
pub struct GmailSender {
    config: GmailConfig,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl GmailSender {
    /// Sender over the Gmail REST API
    pub fn new(config: GmailConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            token: Mutex::new(None),
        }
    }

    fn credentials(&self) -> OutreachResult<(&str, &str, &str)> {
        match (
            self.config.client_id.as_deref(),
            self.config.client_secret.as_deref(),
            self.config.refresh_token.as_deref(),
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok((id, secret, refresh)),
            _ => Err(OutreachError::Dependency(
                "Variables Gmail manquantes: GMAIL_CLIENT_ID, GMAIL_CLIENT_SECRET, GMAIL_REFRESH_TOKEN".into(),
            )),
        }
    }

    async fn access_token(&self) -> OutreachResult<String> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|t| Instant::now() + TOKEN_MARGIN < t.expires_at)
            .map(|t| t.access_token.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let (client_id, client_secret, refresh_token) = self.credentials()?;
        let res = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Gmail injoignable: {e}")))?;

        if !res.status().is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(OutreachError::Dependency(format!(
                "Erreur lors du rafraichissement du token Gmail: {body}"
            )));
        }

        let token: TokenResponse = res
            .json()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Reponse Gmail invalide: {e}")))?;
        let access_token = token.access_token.clone();
        *self.token.lock() = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }

    async fn sender_address(&self, access_token: &str) -> OutreachResult<String> {
        let res = self
            .client
            .get(GMAIL_PROFILE_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Gmail injoignable: {e}")))?;
        if !res.status().is_success() {
            return Err(OutreachError::Dependency(
                "Impossible de recuperer le profil Gmail".into(),
            ));
        }
        let profile: ProfileResponse = res
            .json()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Profil Gmail invalide: {e}")))?;
        Ok(profile.email_address)
    }
}

#[async_trait]
impl EmailSender for GmailSender {
    async fn send(&self, email: &OutgoingEmail) -> OutreachResult<()> {
        let access_token = self.access_token().await?;
        let from = self.sender_address(&access_token).await?;
        let raw = URL_SAFE_NO_PAD.encode(build_message(&from, email).as_bytes());

        let res = self
            .client
            .post(GMAIL_SEND_URL)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Gmail injoignable: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let message = res
                .json::<GmailErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Erreur Gmail: {}", status.as_u16()));
            return Err(OutreachError::Dependency(message));
        }

        tracing::debug!(to = %email.to, "email delivered");
        Ok(())
    }
}

//! Service Configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outreach service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// Listen address
    pub bind_addr: String,
    /// Directory holding outreach.json, venues.json and submissions/
    pub data_dir: PathBuf,
    /// Public site URL used to build submission links
    pub site_url: String,
    /// Display name on outgoing mail
    pub sender_name: String,
    /// Pause between two sends of a batch
    pub send_delay_ms: u64,
    /// Hard cap on contacts processed per batch
    pub max_batch: u32,
    /// Email content generation
    pub generation: GenerationConfig,
    /// Gmail delivery credentials
    pub gmail: GmailConfig,
    /// Identity verification
    pub auth: AuthConfig,
    /// Request throttling
    pub rate_limit: RateLimitConfig,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            data_dir: PathBuf::from("data/retreats"),
            site_url: "https://maman-logement.vercel.app".into(),
            sender_name: "L'equipe Retraites".into(),
            send_delay_ms: 2000,
            max_batch: 50,
            generation: GenerationConfig::default(),
            gmail: GmailConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl OutreachConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Override deployment values and secrets from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = var(key).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        };
        set(&mut self.generation.api_key, "ANTHROPIC_API_KEY");
        set(&mut self.gmail.client_id, "GMAIL_CLIENT_ID");
        set(&mut self.gmail.client_secret, "GMAIL_CLIENT_SECRET");
        set(&mut self.gmail.refresh_token, "GMAIL_REFRESH_TOKEN");
        set(&mut self.auth.jwt_secret, "AUTH_JWT_SECRET");

        if let Some(url) = var("SITE_URL").filter(|v| !v.is_empty()) {
            self.site_url = url;
        }
        if let Some(dir) = var("OUTREACH_DATA_DIR").filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = var("OUTREACH_BIND").filter(|v| !v.is_empty()) {
            self.bind_addr = addr;
        }
    }

    /// Delay applied between two sends
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

/// Email generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Anthropic API key; generation is disabled without it
    pub api_key: Option<String>,
    /// Messages endpoint
    pub api_url: String,
    /// Model identifier
    pub model: String,
    /// Completion budget for the body request
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-haiku-4-5-20251001".into(),
            max_tokens: 800,
        }
    }
}

/// Gmail OAuth credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    /// OAuth client id
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
    /// Long-lived refresh token for the sending account
    pub refresh_token: Option<String>,
}

/// Identity verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the auth provider
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim
    pub audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            audience: "authenticated".into(),
        }
    }
}

/// Rate limit config
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Fixed window length in seconds
    pub window_secs: u64,
    /// Requests per window on ordinary routes
    pub max_general: u32,
    /// Requests per window on AI routes
    pub max_ai: u32,
    /// Sweep expired entries every N requests
    pub sweep_every: u64,
    /// Path prefixes backed by paid AI calls
    pub ai_routes: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_general: 30,
            max_ai: 10,
            sweep_every: 100,
            ai_routes: vec![
                "/api/outreach/send-batch".into(),
                "/api/outreach/generate-email".into(),
            ],
        }
    }
}

impl RateLimitConfig {
    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: OutreachConfig =
            serde_json::from_str(r#"{"send_delay_ms": 0, "rate_limit": {"max_ai": 3}}"#).unwrap();
        assert_eq!(config.send_delay_ms, 0);
        assert_eq!(config.rate_limit.max_ai, 3);
        assert_eq!(config.rate_limit.max_general, 30);
        assert_eq!(config.max_batch, 50);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("SITE_URL", "https://example.org/"),
            ("GMAIL_REFRESH_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut config = OutreachConfig::default();
        config.apply_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
        assert!(config.gmail.refresh_token.is_none());
        assert_eq!(config.site_url, "https://example.org/");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"sender_name": "Equipe", "max_batch": 20, "gmail": {"client_id": "client"}}"#,
        )
        .unwrap();

        let loaded = OutreachConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.sender_name, "Equipe");
        assert_eq!(loaded.max_batch, 20);
        assert_eq!(loaded.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = OutreachConfig::load(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(OutreachConfig::load("/nonexistent/outreach.json").is_err());
    }
}

//! Personalized email generation
//!
//! Invitation emails are written by the Anthropic Messages API. When the
//! provider is unavailable the batch sender falls back to [`fallback_email`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{OutreachError, OutreachResult};
use crate::models::GeneratedEmail;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DESCRIPTION_LIMIT: usize = 2000;
const SUBJECT_MAX_TOKENS: u32 = 100;

/// Subject used when only the subject request fails
pub const DEFAULT_SUBJECT: &str = "Invitation: rejoignez notre annuaire de lieux de retraite";

/// What the generator knows about a venue
#[derive(Debug, Clone, Default)]
pub struct VenueContext {
    /// Directory ID
    pub venue_id: String,
    /// Display name
    pub venue_name: String,
    /// Directory description, possibly empty
    pub description: String,
    /// Website, possibly empty
    pub website: String,
    /// Personal submission link to embed in the body
    pub form_url: String,
}

/// Email content generation port
#[async_trait]
pub trait EmailGenerator: Send + Sync {
    /// Produce subject and body for one venue
    async fn generate(&self, venue: &VenueContext) -> OutreachResult<GeneratedEmail>;
}

/// Deterministic invitation used when generation is unavailable
pub fn fallback_email(venue_name: &str, form_url: &str) -> GeneratedEmail {
    GeneratedEmail {
        subject: "Rejoignez notre annuaire de lieux de retraite".into(),
        body: format!(
            "Bonjour,\n\n\
             Nous constituons un annuaire en ligne gratuit de lieux de retraite pour les organisateurs de yoga, meditation et bien-etre.\n\n\
             Votre lieu \"{venue_name}\" a retenu notre attention et nous serions ravis de l'inclure dans notre repertoire.\n\n\
             L'inscription est gratuite et prend quelques minutes :\n{form_url}\n\n\
             N'hesitez pas a nous contacter si vous avez des questions.\n\n\
             Cordialement,\nL'equipe Retraites"
        ),
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn system_prompt(venue: &VenueContext) -> String {
    let mut details = format!("- Nom: {}\n", venue.venue_name);
    if !venue.description.is_empty() {
        details.push_str(&format!(
            "- Description: {}\n",
            truncate_chars(&venue.description, DESCRIPTION_LIMIT)
        ));
    }
    if !venue.website.is_empty() {
        details.push_str(&format!("- Site web: {}\n", venue.website));
    }

    format!(
        "Tu es un assistant qui redige des emails de prospection chaleureux et professionnels pour inviter des proprietaires de lieux de retraite a rejoindre un annuaire en ligne gratuit.

CONTEXTE DE LA PLATEFORME:
- Annuaire gratuit de lieux de retraite pour organisateurs de yoga, meditation, bien-etre
- L'objectif est de connecter les proprietaires de lieux avec les organisateurs de retraites
- L'inscription est gratuite et sans engagement
- Le proprietaire peut remplir un formulaire pour decrire son lieu en detail

INFORMATIONS SUR LE LIEU:
{details}
LIEN DU FORMULAIRE D'INSCRIPTION:
{form_url}

CONSIGNES:
- Redige un email court (10-15 lignes) chaleureux et communautaire
- Commence par \"Bonjour\" (ajouter le nom du lieu si pertinent)
- Explique brievement la plateforme (annuaire gratuit pour lieux de retraites)
- Si une description ou un site web est fourni, mentionne des elements specifiques du lieu qui t'ont interesse
- Explique les avantages: visibilite aupres d'organisateurs qualifies, inscription gratuite, profil detaille
- Inclus le lien du formulaire d'inscription de maniere naturelle
- Termine par une invitation a echanger si besoin
- Ton: chaleureux, authentique, professionnel mais pas corporate
- N'ecris QUE le corps de l'email, sans objet, sans \"Objet:\", sans explications autour
- Ne mets pas de crochets [...] ou de placeholders - ecris un email pret a envoyer
- Signe \"L'equipe Retraites\"",
        form_url = venue.form_url,
    )
}

fn subject_prompt(venue_name: &str) -> String {
    format!(
        "Genere un objet d'email court (max 60 caracteres) pour un email d'invitation a un annuaire de lieux de retraite. \
         Le lieu s'appelle \"{venue_name}\". L'objet doit etre engageant, pas trop commercial. \
         Retourne uniquement l'objet, rien d'autre."
    )
}

// ── Messages API request/response ──

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Generator backed by the Anthropic Messages API
pub struct AnthropicGenerator {
    config: GenerationConfig,
    api_key: String,
    client: Client,
}

impl AnthropicGenerator {
    /// Build a generator, or `None` when no credential is configured
    pub fn from_config(config: &GenerationConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Some(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }

    async fn complete(&self, system: Option<&str>, prompt: &str, max_tokens: u32) -> OutreachResult<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Service IA injoignable: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "anthropic api error");
            return Err(OutreachError::Dependency(format!("Erreur du service IA: {status}")));
        }

        let parsed: MessagesResponse = res
            .json()
            .await
            .map_err(|e| OutreachError::Dependency(format!("Reponse IA invalide: {e}")))?;
        parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .find(|text| !text.trim().is_empty())
            .ok_or_else(|| OutreachError::Dependency("Reponse IA vide.".into()))
    }
}

#[async_trait]
impl EmailGenerator for AnthropicGenerator {
    async fn generate(&self, venue: &VenueContext) -> OutreachResult<GeneratedEmail> {
        let body = self
            .complete(
                Some(&system_prompt(venue)),
                "Redige l'email d'invitation pour ce lieu de retraite.",
                self.config.max_tokens,
            )
            .await?;

        let subject = match self
            .complete(None, &subject_prompt(&venue.venue_name), SUBJECT_MAX_TOKENS)
            .await
        {
            Ok(subject) => subject.trim().to_string(),
            Err(e) => {
                tracing::warn!(venue_id = %venue.venue_id, error = %e, "subject generation failed, using default");
                DEFAULT_SUBJECT.to_string()
            }
        };

        Ok(GeneratedEmail { subject, body })
    }
}

//! Batch sending
//!
//! One batch is a bounded, strictly sequential pass over a campaign's pending
//! contacts. Each contact is handled on its own: a generation failure falls
//! back to the fixed template, a delivery failure is recorded and the loop
//! moves on. Contacts are persisted once at the end of the pass, so a request
//! dropped mid-batch leaves no trace of the emails already sent (at-least-once).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::OutreachConfig;
use crate::contacts::apply_status;
use crate::error::{OutreachError, OutreachResult};
use crate::generation::{fallback_email, EmailGenerator, VenueContext};
use crate::mailer::{EmailSender, OutgoingEmail};
use crate::models::{BatchReport, BatchRequest, CampaignStatus, ContactStatus, OutreachContact};
use crate::store::OutreachStore;
use crate::venues::VenueDirectory;

/// Upper bound on contacts per batch, whatever the caller or config asks for
pub const MAX_BATCH: u32 = 50;

/// Batch tuning taken from the service configuration
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Public site URL the submission links point at
    pub site_url: String,
    /// Display name on outgoing mail
    pub sender_name: String,
    /// Pause between two sends
    pub delay: Duration,
    /// Configured batch cap, clamped to `1..=MAX_BATCH`
    pub max_batch: u32,
}

impl BatchSettings {
    /// Settings from the service configuration
    pub fn from_config(config: &OutreachConfig) -> Self {
        Self {
            site_url: config.site_url.clone(),
            sender_name: config.sender_name.clone(),
            delay: config.send_delay(),
            max_batch: config.max_batch.clamp(1, MAX_BATCH),
        }
    }

    fn form_url(&self, token: &str) -> String {
        format!("{}/inscription-lieu/{}", self.site_url.trim_end_matches('/'), token)
    }

    /// Effective batch size; zero or absent means the cap
    fn limit(&self, requested: Option<u32>) -> usize {
        let cap = self.max_batch.clamp(1, MAX_BATCH);
        requested.filter(|n| *n > 0).unwrap_or(cap).min(cap) as usize
    }
}

/// Sends invitation emails for pending contacts
pub struct BatchSender {
    store: OutreachStore,
    venues: Arc<dyn VenueDirectory>,
    generator: Option<Arc<dyn EmailGenerator>>,
    mailer: Arc<dyn EmailSender>,
    settings: BatchSettings,
}

impl BatchSender {
    /// Wire a sender to its collaborators
    pub fn new(
        store: OutreachStore,
        venues: Arc<dyn VenueDirectory>,
        generator: Option<Arc<dyn EmailGenerator>>,
        mailer: Arc<dyn EmailSender>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            store,
            venues,
            generator,
            mailer,
            settings,
        }
    }

    /// Run one batch for `request.campaign_id`
    pub async fn send_batch(&self, request: BatchRequest) -> OutreachResult<BatchReport> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            OutreachError::NotConfigured(
                "Service IA non configure (ANTHROPIC_API_KEY manquante).".into(),
            )
        })?;
        let campaign_id = request
            .campaign_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| OutreachError::Validation("campaign_id est requis.".into()))?;

        let mut data = self.store.load().await;
        let batch: Vec<OutreachContact> = data
            .contacts
            .iter()
            .filter(|c| c.campaign_id == campaign_id && c.status == ContactStatus::Pending)
            .take(self.settings.limit(request.max_count))
            .cloned()
            .collect();

        if batch.is_empty() {
            return Ok(BatchReport {
                message: Some("Aucun contact en attente pour cette campagne.".into()),
                ..Default::default()
            });
        }

        tracing::info!(campaign_id = %campaign_id, size = batch.len(), "batch started");
        let mut report = BatchReport::default();

        for (i, contact) in batch.iter().enumerate() {
            match self.deliver(generator.as_ref(), contact).await {
                Ok(()) => {
                    if let Some(live) = data.contact_mut(&contact.venue_id, &contact.campaign_id) {
                        apply_status(live, ContactStatus::Sent, Utc::now());
                    }
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        campaign_id = %campaign_id,
                        venue_id = %contact.venue_id,
                        error = %e,
                        "outreach email failed"
                    );
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("{} ({}): {}", contact.venue_name, contact.email, e));
                }
            }

            if i + 1 < batch.len() && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        if let Some(campaign) = data.campaign_mut(&campaign_id) {
            if campaign.status == CampaignStatus::Draft {
                campaign.status = CampaignStatus::Active;
            }
        }
        self.store.save(&data).await?;

        tracing::info!(
            campaign_id = %campaign_id,
            sent = report.sent,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }

    async fn deliver(&self, generator: &dyn EmailGenerator, contact: &OutreachContact) -> OutreachResult<()> {
        let form_url = self.settings.form_url(&contact.form_token);
        let venue = self.venues.get(&contact.venue_id).await?.unwrap_or_default();

        let context = VenueContext {
            venue_id: contact.venue_id.clone(),
            venue_name: contact.venue_name.clone(),
            description: venue.description,
            website: venue.website.unwrap_or_default(),
            form_url,
        };

        let email = match generator.generate(&context).await {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(venue_id = %contact.venue_id, error = %e, "generation failed, using fallback template");
                fallback_email(&contact.venue_name, &context.form_url)
            }
        };

        self.mailer
            .send(&OutgoingEmail {
                to: contact.email.clone(),
                subject: email.subject,
                body: email.body,
                from_name: Some(self.settings.sender_name.clone()),
            })
            .await
    }
}

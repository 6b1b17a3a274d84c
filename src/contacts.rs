//! Contact lifecycle
//!
//! ```text
//! pending ──► sent ──► opened | replied | bounced | form_submitted
//! ```
//!
//! `sent_at`, `opened_at` and `replied_at` are stamped the first time their
//! status is reached and never rewritten afterwards. `form_submitted` is only
//! reachable through a venue submission.

use chrono::{DateTime, Utc};

use crate::error::{OutreachError, OutreachResult};
use crate::models::{ContactStatus, ContactUpdate, OutreachContact};
use crate::store::OutreachStore;

/// Move `contact` to `status`, stamping the matching timestamp if unset
pub fn apply_status(contact: &mut OutreachContact, status: ContactStatus, now: DateTime<Utc>) {
    contact.status = status;
    let stamp = match status {
        ContactStatus::Sent => &mut contact.sent_at,
        ContactStatus::Opened => &mut contact.opened_at,
        ContactStatus::Replied => &mut contact.replied_at,
        _ => return,
    };
    stamp.get_or_insert(now);
}

/// Contacts of one campaign, in store order
pub async fn list_contacts(store: &OutreachStore, campaign_id: &str) -> Vec<OutreachContact> {
    store
        .load()
        .await
        .contacts
        .into_iter()
        .filter(|c| c.campaign_id == campaign_id)
        .collect()
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Apply an operator update to one contact and persist it
pub async fn update_contact(
    store: &OutreachStore,
    update: ContactUpdate,
) -> OutreachResult<OutreachContact> {
    let (Some(venue_id), Some(campaign_id)) = (required(update.venue_id), required(update.campaign_id))
    else {
        return Err(OutreachError::Validation(
            "venue_id et campaign_id sont requis.".into(),
        ));
    };

    match update.status {
        Some(ContactStatus::Pending) => {
            return Err(OutreachError::Validation(
                "Un contact ne peut pas etre remis en attente.".into(),
            ))
        }
        Some(ContactStatus::FormSubmitted) => {
            return Err(OutreachError::Validation(
                "Le statut form_submitted est reserve au formulaire d'inscription.".into(),
            ))
        }
        _ => {}
    }

    let mut data = store.load().await;
    let contact = data
        .contact_mut(&venue_id, &campaign_id)
        .ok_or_else(|| OutreachError::NotFound("Contact non trouve.".into()))?;

    if let Some(status) = update.status {
        apply_status(contact, status, Utc::now());
    }
    if let Some(notes) = update.notes {
        contact.notes = notes;
    }
    if let Some(count) = update.follow_up_count {
        contact.follow_up_count = count;
    }
    if let Some(at) = update.next_follow_up_at {
        contact.next_follow_up_at = Some(at);
    }

    let updated = contact.clone();
    store.save(&data).await?;

    tracing::info!(
        venue_id = %updated.venue_id,
        campaign_id = %updated.campaign_id,
        status = %updated.status,
        "contact updated"
    );
    Ok(updated)
}

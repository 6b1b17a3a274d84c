//! Campaign management

use std::collections::HashSet;

use chrono::Utc;

use crate::error::{OutreachError, OutreachResult};
use crate::models::{
    Campaign, CampaignCreate, CampaignCreated, CampaignStats, CampaignStatus, ContactStatus,
    OutreachContact, OutreachData, TargetFilter, Venue,
};
use crate::store::{generate_token, OutreachStore};
use crate::venues::VenueDirectory;

/// Aggregate counts over one campaign's contacts
pub fn compute_stats(contacts: &[OutreachContact], campaign_id: &str) -> CampaignStats {
    contacts
        .iter()
        .filter(|c| c.campaign_id == campaign_id)
        .fold(CampaignStats::default(), |mut stats, c| {
            stats.total += 1;
            match c.status {
                ContactStatus::Pending => {}
                status => {
                    stats.sent += 1;
                    match status {
                        ContactStatus::Opened => stats.opened += 1,
                        ContactStatus::Replied => stats.replied += 1,
                        ContactStatus::Bounced => stats.bounced += 1,
                        ContactStatus::FormSubmitted => stats.form_submitted += 1,
                        _ => {}
                    }
                }
            }
            stats
        })
}

/// Campaigns of `data` with `stats` recomputed from the live contact list
pub fn with_live_stats(data: &OutreachData) -> Vec<Campaign> {
    data.campaigns
        .iter()
        .map(|campaign| Campaign {
            stats: compute_stats(&data.contacts, &campaign.id),
            ..campaign.clone()
        })
        .collect()
}

/// List campaigns with live stats
pub async fn list_campaigns(store: &OutreachStore) -> Vec<Campaign> {
    with_live_stats(&store.load().await)
}

fn matches_filter(venue: &Venue, filter: &TargetFilter) -> bool {
    if let Some(countries) = filter.countries.as_ref().filter(|c| !c.is_empty()) {
        match &venue.country {
            Some(country) if countries.contains(country) => {}
            _ => return false,
        }
    }

    if let Some(regions) = filter.regions.as_ref().filter(|r| !r.is_empty()) {
        let Some(region) = &venue.region else {
            return false;
        };
        let region = region.to_lowercase();
        if !regions.iter().any(|r| region.contains(&r.to_lowercase())) {
            return false;
        }
    }

    // `categories` has no venue attribute to match against; it is kept on the
    // campaign for reference only.
    true
}

/// Build pending contacts for the venues eligible to join `campaign_id`.
///
/// A venue is eligible when it has a contact email, is not already a contact
/// of any campaign in `existing`, and matches `filter`.
pub fn select_contacts(
    venues: &[Venue],
    existing: &[OutreachContact],
    filter: &TargetFilter,
    campaign_id: &str,
) -> Vec<OutreachContact> {
    let mut seen: HashSet<&str> = existing.iter().map(|c| c.venue_id.as_str()).collect();
    let mut contacts = Vec::new();

    for venue in venues {
        let Some(email) = venue.contact_email.as_deref().filter(|e| !e.trim().is_empty()) else {
            continue;
        };
        if seen.contains(venue.id.as_str()) || !matches_filter(venue, filter) {
            continue;
        }
        seen.insert(venue.id.as_str());

        contacts.push(OutreachContact {
            venue_id: venue.id.clone(),
            venue_name: venue.name.clone(),
            email: email.trim().to_string(),
            status: ContactStatus::Pending,
            campaign_id: campaign_id.to_string(),
            sent_at: None,
            opened_at: None,
            replied_at: None,
            form_token: generate_token(),
            follow_up_count: 0,
            next_follow_up_at: None,
            notes: String::new(),
        });
    }

    contacts
}

/// Create a campaign and attach its contact list
pub async fn create_campaign(
    store: &OutreachStore,
    venues: &dyn VenueDirectory,
    input: CampaignCreate,
) -> OutreachResult<CampaignCreated> {
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| OutreachError::Validation("Le nom de la campagne est requis.".into()))?
        .to_string();

    let mut data = store.load().await;
    let filter = input.target_filter.unwrap_or_default();

    let mut campaign = Campaign {
        id: generate_token(),
        name,
        created_at: Utc::now(),
        status: CampaignStatus::Draft,
        target_filter: filter,
        email_template_id: input.email_template_id.unwrap_or_default(),
        stats: CampaignStats::default(),
    };

    let directory = venues.all().await?;
    let contacts = select_contacts(&directory, &data.contacts, &campaign.target_filter, &campaign.id);
    let contacts_added = contacts.len() as u64;
    campaign.stats.total = contacts_added;

    data.campaigns.push(campaign.clone());
    data.contacts.extend(contacts);
    store.save(&data).await?;

    tracing::info!(
        campaign_id = %campaign.id,
        name = %campaign.name,
        contacts_added,
        "campaign created"
    );

    Ok(CampaignCreated {
        campaign,
        contacts_added,
    })
}

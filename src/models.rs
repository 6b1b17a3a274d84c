//! API Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============ Campaigns ============

/// Outreach campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Campaign {
    /// Campaign ID
    pub id: String,
    /// Operator-facing name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: CampaignStatus,
    /// Filter the contacts were selected with
    #[serde(default)]
    pub target_filter: TargetFilter,
    /// Template label, empty unless given
    #[serde(default)]
    pub email_template_id: String,
    /// Derived view, recomputed from contacts on every read
    #[serde(default)]
    pub stats: CampaignStats,
}

/// Campaign status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Created, nothing sent yet
    #[default]
    Draft,
    /// At least one batch ran
    Active,
    /// Stopped by the operator
    Paused,
    /// Finished
    Completed,
}

/// Contact selection criteria, applied once at creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TargetFilter {
    /// Keep venues whose country is listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    /// Keep venues whose region is listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    /// Accepted and stored but not matched against venues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Per-campaign contact counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CampaignStats {
    /// Contacts in the campaign
    pub total: u64,
    /// Contacts no longer pending
    pub sent: u64,
    /// Contacts in `opened`
    pub opened: u64,
    /// Contacts in `replied`
    pub replied: u64,
    /// Bounced
    pub bounced: u64,
    /// Submitted the listing form
    pub form_submitted: u64,
}

/// Campaign creation request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CampaignCreate {
    /// Required, must not be blank
    pub name: Option<String>,
    /// Selection criteria; all venues when absent
    pub target_filter: Option<TargetFilter>,
    /// Template label
    pub email_template_id: Option<String>,
}

/// Campaign creation response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignCreated {
    /// The new campaign
    pub campaign: Campaign,
    /// Contacts created for it
    pub contacts_added: u64,
}

/// Campaign list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignList {
    /// All campaigns with live stats
    pub campaigns: Vec<Campaign>,
}

// ============ Contacts ============

/// One venue's outreach record within one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OutreachContact {
    /// Directory ID of the venue
    pub venue_id: String,
    /// Venue name at selection time
    pub venue_name: String,
    /// Recipient address
    pub email: String,
    /// Lifecycle status
    pub status: ContactStatus,
    /// Owning campaign
    pub campaign_id: String,
    /// First send, set once
    pub sent_at: Option<DateTime<Utc>>,
    /// First open, set once
    pub opened_at: Option<DateTime<Utc>>,
    /// First reply, set once
    pub replied_at: Option<DateTime<Utc>>,
    /// Unique token in the submission link
    pub form_token: String,
    /// Follow-ups sent so far
    #[serde(default)]
    pub follow_up_count: u32,
    /// Next planned follow-up
    #[serde(default)]
    pub next_follow_up_at: Option<DateTime<Utc>>,
    /// Operator notes
    #[serde(default)]
    pub notes: String,
}

/// Contact lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Not contacted yet
    #[default]
    Pending,
    /// Invitation delivered
    Sent,
    /// Invitation opened
    Opened,
    /// Owner replied
    Replied,
    /// Delivery bounced
    Bounced,
    /// Listing form submitted
    FormSubmitted,
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Opened => write!(f, "opened"),
            Self::Replied => write!(f, "replied"),
            Self::Bounced => write!(f, "bounced"),
            Self::FormSubmitted => write!(f, "form_submitted"),
        }
    }
}

/// Contact update request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ContactUpdate {
    /// Required
    pub venue_id: Option<String>,
    /// Required
    pub campaign_id: Option<String>,
    /// New status
    pub status: Option<ContactStatus>,
    /// Replaces the notes
    pub notes: Option<String>,
    /// Replaces the follow-up count
    pub follow_up_count: Option<u32>,
    /// Replaces the next follow-up date
    pub next_follow_up_at: Option<DateTime<Utc>>,
}

/// Single contact response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    /// Contact after the update
    pub contact: OutreachContact,
}

/// Contact list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContactList {
    /// Contacts of the campaign, in store order
    pub contacts: Vec<OutreachContact>,
}

// ============ Store ============

/// The whole persisted outreach document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutreachData {
    /// Campaigns in creation order
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    /// Contacts of every campaign
    #[serde(default)]
    pub contacts: Vec<OutreachContact>,
}

impl OutreachData {
    /// Find a contact by its `(venue_id, campaign_id)` key
    pub fn contact_mut(&mut self, venue_id: &str, campaign_id: &str) -> Option<&mut OutreachContact> {
        self.contacts
            .iter_mut()
            .find(|c| c.venue_id == venue_id && c.campaign_id == campaign_id)
    }

    /// Find a campaign by id
    pub fn campaign_mut(&mut self, id: &str) -> Option<&mut Campaign> {
        self.campaigns.iter_mut().find(|c| c.id == id)
    }
}

// ============ Venues ============

/// Venue record from the retreat directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Directory ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// ISO country code
    #[serde(default)]
    pub country: Option<String>,
    /// Region name
    #[serde(default)]
    pub region: Option<String>,
    /// Where invitations go
    #[serde(default)]
    pub contact_email: Option<String>,
    /// Public website
    #[serde(default)]
    pub website: Option<String>,
}

// ============ Batch sending ============

/// Batch send request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// Campaign to send for
    pub campaign_id: Option<String>,
    /// Requested size, capped at 50
    pub max_count: Option<u32>,
}

/// Batch send outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchReport {
    /// Emails delivered
    pub sent: u32,
    /// Contacts that failed
    pub failed: u32,
    /// One `name (email): reason` line per failure
    pub errors: Vec<String>,
    /// Set when no contact was pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============ Generation ============

/// Email generation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateEmailRequest {
    /// Directory ID
    pub venue_id: Option<String>,
    /// Required
    pub venue_name: Option<String>,
    /// Optional description
    pub venue_description: Option<String>,
    /// Optional website
    pub venue_website: Option<String>,
    /// Required submission link
    pub form_url: Option<String>,
}

/// Generated email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratedEmail {
    /// Subject line
    pub subject: String,
    /// Plain-text body
    #[serde(rename = "email")]
    pub body: String,
}

// ============ Statistics ============

/// Aggregate outreach statistics across all campaigns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OutreachStats {
    /// All campaigns
    pub total_campaigns: u64,
    /// Campaigns in `active`
    pub active_campaigns: u64,
    /// All contacts
    pub total_contacts: u64,
    /// Contacts in `pending`
    pub pending: u64,
    /// Contacts in `sent`
    pub sent: u64,
    /// Contacts in `opened`
    pub opened: u64,
    /// Contacts in `replied`
    pub replied: u64,
    /// Contacts in `bounced`
    pub bounced: u64,
    /// Contacts in `form_submitted`
    pub form_submitted: u64,
    /// Percent of contacts no longer pending
    pub send_rate: u32,
    /// Percent of contacted venues that opened, replied or submitted
    pub open_rate: u32,
    /// Percent of contacted venues that replied or submitted
    pub reply_rate: u32,
    /// Percent of contacted venues that submitted
    pub form_rate: u32,
}

/// Statistics response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Global statistics
    pub stats: OutreachStats,
}

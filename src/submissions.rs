//! Public venue submission
//!
//! Venue owners reach the submission form through the link in their
//! invitation. The form token is the only credential: it is looked up among
//! contacts, accepted once, and burnt by moving its contact to
//! `form_submitted`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contacts::apply_status;
use crate::error::{OutreachError, OutreachResult};
use crate::models::ContactStatus;
use crate::store::OutreachStore;

const SUBMISSIONS_DIRNAME: &str = "submissions";

// ============ Form schema ============

fn default_currency() -> Option<String> {
    Some("EUR".into())
}

/// Venue listing data entered by the owner
///
/// Field names follow the listing form.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VenueFormData {
    // Basic information
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,

    // Spaces
    #[serde(default)]
    pub capacity_min: Option<i64>,
    #[serde(default)]
    pub capacity_max: Option<i64>,
    #[serde(default)]
    pub num_rooms: Option<i64>,
    #[serde(default)]
    pub num_beds: Option<i64>,
    #[serde(default)]
    pub accommodation_types: Vec<String>,
    #[serde(default)]
    pub activity_spaces: Vec<String>,
    #[serde(default)]
    pub outdoor_spaces: Vec<String>,
    #[serde(default)]
    pub main_practice_space_capacity: Option<i64>,
    #[serde(default)]
    pub main_practice_space_m2: Option<f64>,

    // Dining
    #[serde(default)]
    pub meal_service: Option<String>,
    #[serde(default)]
    pub cuisine_options: Vec<String>,
    #[serde(default)]
    pub kitchen_access: Option<bool>,
    #[serde(default)]
    pub kitchen_type: Option<String>,
    #[serde(default)]
    pub kitchen_equipment: Vec<String>,

    // Pricing
    #[serde(default = "default_currency")]
    pub currency: Option<String>,
    #[serde(default)]
    pub price_per_person_per_night: Option<f64>,
    #[serde(default)]
    pub price_full_venue_per_day: Option<f64>,
    #[serde(default)]
    pub meals_included_in_price: Option<bool>,
    #[serde(default)]
    pub deposit_required: Option<String>,
    #[serde(default)]
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub seasonal_availability: Option<String>,

    // Photos
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image_categories: BTreeMap<String, Vec<String>>,

    // Policies and services
    #[serde(default)]
    pub alcohol_policy: Option<String>,
    #[serde(default)]
    pub children_welcome: Option<bool>,
    #[serde(default)]
    pub accessible: Option<bool>,
    #[serde(default)]
    pub smoking_policy: Option<String>,
    #[serde(default)]
    pub pets_allowed: Option<bool>,
    #[serde(default)]
    pub noise_level: Option<String>,
    #[serde(default)]
    pub ceremonies_allowed: Option<bool>,
    #[serde(default)]
    pub languages_spoken: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub suitable_for: Vec<String>,
    #[serde(default)]
    pub specialized_equipment: Vec<String>,
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty() && !label.contains('@'))
}

impl VenueFormData {
    /// Parse raw form input, reporting shape errors like validation errors
    pub fn parse(raw: serde_json::Value) -> OutreachResult<Self> {
        let form: Self = serde_json::from_value(raw).map_err(|e| OutreachError::InvalidForm {
            details: vec![format!("formData: {e}")],
        })?;
        let details = form.validate();
        if details.is_empty() {
            Ok(form)
        } else {
            Err(OutreachError::InvalidForm { details })
        }
    }

    /// Schema violations as `"field: message"` lines
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                issues.push(format!("{field}: {message}"));
            }
        };

        check(
            self.name.chars().count() >= 2,
            "name",
            "Le nom du lieu est requis (min. 2 caracteres)",
        );
        check(
            self.description.chars().count() >= 20,
            "description",
            "La description est requise (min. 20 caracteres)",
        );
        check(!self.country.is_empty(), "country", "Le pays est requis");
        check(
            self.website.is_empty() || is_http_url(&self.website),
            "website",
            "URL invalide",
        );
        check(is_email(&self.contact_email), "contact_email", "Email invalide");

        for (field, value) in [
            ("capacity_min", self.capacity_min),
            ("capacity_max", self.capacity_max),
            ("num_rooms", self.num_rooms),
            ("num_beds", self.num_beds),
            ("main_practice_space_capacity", self.main_practice_space_capacity),
        ] {
            check(value.map_or(true, |v| v > 0), field, "Doit etre un entier positif");
        }
        for (field, value) in [
            ("main_practice_space_m2", self.main_practice_space_m2),
            ("price_per_person_per_night", self.price_per_person_per_night),
            ("price_full_venue_per_day", self.price_full_venue_per_day),
        ] {
            check(value.map_or(true, |v| v > 0.0), field, "Doit etre un nombre positif");
        }
        for (i, image) in self.images.iter().enumerate() {
            check(is_http_url(image), format!("images.{i}").as_str(), "URL invalide");
        }

        issues
    }
}

// ============ Requests and records ============

/// Token check outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenValidation {
    /// Token exists and is still pending or sent
    pub valid: bool,
    /// Venue name, when valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    /// Venue ID, when valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    /// Reason shown to the owner, when invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenValidation {
    /// Invalid token, with an optional reason
    pub fn rejected(error: Option<&str>) -> Self {
        Self {
            error: error.map(str::to_string),
            ..Default::default()
        }
    }
}

/// Venue submission request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRequest {
    /// Form token from the invitation link
    pub token: Option<String>,
    /// Raw form, validated server side
    #[serde(rename = "formData")]
    #[schema(value_type = Option<Object>)]
    pub form_data: Option<serde_json::Value>,
}

/// Venue submission response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionAccepted {
    /// Always `true`
    pub success: bool,
    /// Confirmation shown to the owner
    pub message: String,
}

/// Stored submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Venue the token was issued for
    pub venue_id: String,
    /// Venue name at submission time
    pub venue_name: String,
    /// Campaign of the invitation
    pub campaign_id: String,
    /// Burned form token
    pub token: String,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
    /// Validated form
    pub data: VenueFormData,
}

/// One JSON file per venue under `submissions/`
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    dir: PathBuf,
}

impl SubmissionStore {
    /// Store rooted at `<data_dir>/submissions`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join(SUBMISSIONS_DIRNAME),
        }
    }

    /// File holding the submission of `venue_id`
    ///
    /// ASCII alphanumerics and `-` are kept; every other byte, `_` included,
    /// becomes `_XX` so distinct ids never share a file.
    pub fn path_for(&self, venue_id: &str) -> PathBuf {
        let mut name = String::with_capacity(venue_id.len());
        for byte in venue_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("_{byte:02X}"));
            }
        }
        self.dir.join(format!("{name}.json"))
    }

    /// Write or replace the record of its venue
    pub async fn write(&self, record: &SubmissionRecord) -> OutreachResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(self.path_for(&record.venue_id), content).await?;
        Ok(())
    }

    /// `None` when the venue never submitted
    pub async fn read(&self, venue_id: &str) -> OutreachResult<Option<SubmissionRecord>> {
        match tokio::fs::read_to_string(self.path_for(venue_id)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ============ Operations ============

/// Check a form token without consuming it
pub async fn validate_token(store: &OutreachStore, token: &str) -> TokenValidation {
    let data = store.load().await;
    match data.contacts.iter().find(|c| c.form_token == token) {
        None => TokenValidation::rejected(None),
        Some(c) if c.status == ContactStatus::FormSubmitted => {
            TokenValidation::rejected(Some("Ce formulaire a deja ete soumis."))
        }
        Some(c) => TokenValidation {
            valid: true,
            venue_name: Some(c.venue_name.clone()),
            venue_id: Some(c.venue_id.clone()),
            error: None,
        },
    }
}

/// Record a venue submission and burn its token
pub async fn submit(
    store: &OutreachStore,
    submissions: &SubmissionStore,
    request: SubmissionRequest,
) -> OutreachResult<SubmissionAccepted> {
    let token = request
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OutreachError::Validation("Token manquant.".into()))?;

    let mut data = store.load().await;
    let contact = data
        .contacts
        .iter_mut()
        .find(|c| c.form_token == token)
        .ok_or_else(|| OutreachError::Forbidden("Token invalide.".into()))?;
    if contact.status == ContactStatus::FormSubmitted {
        return Err(OutreachError::Conflict("Ce formulaire a deja ete soumis.".into()));
    }

    let form = VenueFormData::parse(request.form_data.unwrap_or(serde_json::Value::Null))?;

    let record = SubmissionRecord {
        venue_id: contact.venue_id.clone(),
        venue_name: contact.venue_name.clone(),
        campaign_id: contact.campaign_id.clone(),
        token,
        submitted_at: Utc::now(),
        data: form,
    };
    submissions.write(&record).await?;

    apply_status(contact, ContactStatus::FormSubmitted, record.submitted_at);
    store.save(&data).await?;

    tracing::info!(
        venue_id = %record.venue_id,
        campaign_id = %record.campaign_id,
        "venue submission recorded"
    );
    Ok(SubmissionAccepted {
        success: true,
        message: "Inscription enregistree avec succes.".into(),
    })
}

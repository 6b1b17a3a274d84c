//! Retreat Venue Outreach API
//!
//! Invites retreat venues to join the directory: campaigns select venues,
//! batches send them a personalized invitation, and the link in each email
//! lets the owner submit a listing once.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           OUTREACH API                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                             GATE                                 │   │
//! │  │        Per-IP Rate Limiting | Bearer JWT | AI Route Guard        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │  Campaigns   │  │   Contacts   │  │    Batch     │  │  Venue      │ │
//! │  │  + Stats     │  │  Lifecycle   │  │   Sender     │  │  Submission │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────────┘ │
//! │                                             │                           │
//! │                          ┌──────────────────┼──────────────┐            │
//! │                          ▼                  ▼              ▼            │
//! │                   ┌────────────┐    ┌────────────┐  ┌────────────┐     │
//! │                   │ Generator  │    │   Mailer   │  │   Venue    │     │
//! │                   │ (Anthropic)│    │  (Gmail)   │  │ Directory  │     │
//! │                   └────────────┘    └────────────┘  └────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 STORE  (outreach.json, submissions/)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod campaigns;
pub mod config;
pub mod contacts;
pub mod error;
pub mod generation;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod stats;
pub mod store;
pub mod submissions;
pub mod venues;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use batch::{BatchSender, BatchSettings};
use config::OutreachConfig;
use generation::{AnthropicGenerator, EmailGenerator};
use mailer::{EmailSender, GmailSender};
use middleware::{auth::AuthVerifier, rate_limit::RateLimiter};
use store::OutreachStore;
use submissions::SubmissionStore;
use venues::{JsonVenueDirectory, VenueDirectory};

pub use error::{OutreachError, OutreachResult};
pub use models::*;

/// API state
pub struct ApiState {
    /// Effective configuration
    pub config: OutreachConfig,
    /// Outreach document
    pub store: OutreachStore,
    /// Venue directory
    pub venues: Arc<dyn VenueDirectory>,
    /// `None` when no generation credential is configured
    pub generator: Option<Arc<dyn EmailGenerator>>,
    /// Batch sender
    pub batch: BatchSender,
    /// Submission records
    pub submissions: SubmissionStore,
    /// Per-IP limiter
    pub rate_limiter: RateLimiter,
    /// Bearer token verifier
    pub auth: AuthVerifier,
}

impl ApiState {
    /// Assemble state around the given collaborators
    pub fn new(
        config: OutreachConfig,
        venues: Arc<dyn VenueDirectory>,
        generator: Option<Arc<dyn EmailGenerator>>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        let store = OutreachStore::new(&config.data_dir);
        let batch = BatchSender::new(
            store.clone(),
            venues.clone(),
            generator.clone(),
            mailer,
            BatchSettings::from_config(&config),
        );
        Self {
            submissions: SubmissionStore::new(&config.data_dir),
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            auth: AuthVerifier::new(&config.auth),
            store,
            venues,
            generator,
            batch,
            config,
        }
    }

    /// Production wiring: JSON venue directory, Anthropic generator, Gmail delivery
    pub fn from_config(config: OutreachConfig) -> Self {
        let venues = Arc::new(JsonVenueDirectory::new(&config.data_dir));
        let generator = AnthropicGenerator::from_config(&config.generation)
            .map(|g| Arc::new(g) as Arc<dyn EmailGenerator>);
        if generator.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set, generation and batch sending disabled");
        }
        let mailer = Arc::new(GmailSender::new(config.gmail.clone()));
        Self::new(config, venues, generator, mailer)
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Outreach API",
        version = "0.1.0",
        description = "Retreat venue outreach - campaigns, batch sending, venue submissions"
    ),
    paths(
        routes::health::health_check,
        routes::campaigns::list,
        routes::campaigns::create,
        routes::contacts::list,
        routes::contacts::update,
        routes::send_batch::send_batch,
        routes::generate_email::generate_email,
        routes::stats::get_stats,
        routes::venue_submission::validate_token,
        routes::venue_submission::submit,
    ),
    components(
        schemas(
            Campaign, CampaignStatus, TargetFilter, CampaignStats,
            CampaignCreate, CampaignCreated, CampaignList,
            OutreachContact, ContactStatus, ContactUpdate, ContactResponse, ContactList,
            BatchRequest, BatchReport,
            GenerateEmailRequest, GeneratedEmail,
            OutreachStats, StatsResponse,
            submissions::VenueFormData, submissions::TokenValidation,
            submissions::SubmissionRequest, submissions::SubmissionAccepted,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "campaigns", description = "Campaign management"),
        (name = "contacts", description = "Contact lifecycle"),
        (name = "outreach", description = "Email generation, batch sending and statistics"),
        (name = "venue-submission", description = "Public venue listing form")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/outreach", outreach_routes())
        .nest("/api/venue-submission", routes::venue_submission::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::gate,
                )),
        )
        .with_state(state)
}

fn outreach_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .nest("/campaigns", routes::campaigns::router())
        .nest("/contacts", routes::contacts::router())
        .nest("/send-batch", routes::send_batch::router())
        .nest("/generate-email", routes::generate_email::router())
        .nest("/stats", routes::stats::router())
}

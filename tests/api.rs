//! End-to-end tests over the full router

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{json, Value};

use outreach_api::config::OutreachConfig;
use outreach_api::generation::{EmailGenerator, VenueContext};
use outreach_api::mailer::{EmailSender, OutgoingEmail};
use outreach_api::middleware::auth::Claims;
use outreach_api::venues::InMemoryVenueDirectory;
use outreach_api::{build_router, ApiState, GeneratedEmail, OutreachResult, Venue};

const SECRET: &str = "integration-secret";

struct StaticGenerator;

#[async_trait]
impl EmailGenerator for StaticGenerator {
    async fn generate(&self, venue: &VenueContext) -> OutreachResult<GeneratedEmail> {
        Ok(GeneratedEmail {
            subject: format!("Invitation {}", venue.venue_name),
            body: venue.form_url.clone(),
        })
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> OutreachResult<()> {
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

struct Harness {
    server: TestServer,
    mailer: Arc<RecordingMailer>,
    dir: tempfile::TempDir,
}

fn venues() -> Vec<Venue> {
    let venue = |id: &str, country: &str| Venue {
        id: id.into(),
        name: format!("Lieu {id}"),
        description: "Un lieu calme".into(),
        country: Some(country.into()),
        contact_email: Some(format!("{id}@example.org")),
        ..Default::default()
    };
    vec![
        venue("be1", "BE"),
        venue("be2", "BE"),
        venue("be3", "BE"),
        venue("fr1", "FR"),
        venue("fr2", "FR"),
    ]
}

fn harness_with(configure: impl FnOnce(&mut OutreachConfig), with_generator: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = OutreachConfig {
        data_dir: dir.path().to_path_buf(),
        site_url: "https://example.org".into(),
        send_delay_ms: 0,
        ..Default::default()
    };
    config.auth.jwt_secret = Some(SECRET.into());
    configure(&mut config);

    let mailer = Arc::new(RecordingMailer::default());
    let generator = with_generator.then(|| Arc::new(StaticGenerator) as Arc<dyn EmailGenerator>);
    let state = ApiState::new(
        config,
        Arc::new(InMemoryVenueDirectory::new(venues())),
        generator,
        mailer.clone(),
    );

    Harness {
        server: TestServer::new(build_router(state)).unwrap(),
        mailer,
        dir,
    }
}

fn harness() -> Harness {
    harness_with(|_| {}, true)
}

fn bearer() -> HeaderValue {
    let claims = Claims {
        sub: "operator-1".into(),
        email: Some("ops@example.org".into()),
        role: Some("authenticated".into()),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        aud: "authenticated".into(),
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

async fn create_campaign(h: &Harness, body: Value) -> Value {
    let response = h
        .server
        .post("/api/outreach/campaigns")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()
}

async fn contacts(h: &Harness, campaign_id: &str) -> Vec<Value> {
    let response = h
        .server
        .get("/api/outreach/contacts")
        .add_query_param("campaignId", campaign_id)
        .add_header(header::AUTHORIZATION, bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()["contacts"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_health_and_openapi_are_public() {
    let h = harness();
    let health = h.server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    assert_eq!(health.json::<Value>()["status"], "ok");

    let doc = h.server.get("/api-docs/openapi.json").await;
    assert_eq!(doc.status_code(), StatusCode::OK);
    assert!(doc.json::<Value>()["paths"]["/api/outreach/send-batch"].is_object());
}

#[tokio::test]
async fn test_operator_routes_require_identity() {
    let h = harness();
    let response = h.server.get("/api/outreach/stats").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "unauthorized");

    let response = h
        .server
        .post("/api/outreach/send-batch")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer forged"))
        .json(&json!({"campaign_id": "c1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_stats() {
    let h = harness();
    let response = h
        .server
        .get("/api/outreach/stats")
        .add_header(header::AUTHORIZATION, bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let stats = &response.json::<Value>()["stats"];
    assert_eq!(stats["total_campaigns"], 0);
    for rate in ["send_rate", "open_rate", "reply_rate", "form_rate"] {
        assert_eq!(stats[rate], 0);
    }
}

#[tokio::test]
async fn test_campaign_creation_and_validation() {
    let h = harness();

    let response = h
        .server
        .post("/api/outreach/campaigns")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"name": "   "}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Le nom de la campagne est requis.");

    let created = create_campaign(&h, json!({"name": "Belgique", "target_filter": {"countries": ["BE"]}})).await;
    assert_eq!(created["contacts_added"], 3);
    assert_eq!(created["campaign"]["stats"]["total"], 3);
    assert_eq!(created["campaign"]["status"], "draft");

    // Already-contacted venues are never picked again.
    let second = create_campaign(&h, json!({"name": "Tout"})).await;
    assert_eq!(second["contacts_added"], 2);

    let list = h
        .server
        .get("/api/outreach/campaigns")
        .add_header(header::AUTHORIZATION, bearer())
        .await
        .json::<Value>();
    assert_eq!(list["campaigns"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_contacts_listing_and_updates() {
    let h = harness();
    let created = create_campaign(&h, json!({"name": "Belgique", "target_filter": {"countries": ["BE"]}})).await;
    let campaign_id = created["campaign"]["id"].as_str().unwrap().to_string();

    let response = h
        .server
        .get("/api/outreach/contacts")
        .add_header(header::AUTHORIZATION, bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .patch("/api/outreach/contacts")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"venue_id": "fr1", "campaign_id": campaign_id, "status": "opened"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = h
        .server
        .patch("/api/outreach/contacts")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"venue_id": "be1", "campaign_id": campaign_id, "status": "opened", "notes": "Interesse"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let contact = &response.json::<Value>()["contact"];
    assert_eq!(contact["status"], "opened");
    assert!(contact["opened_at"].is_string());
    assert!(contact["sent_at"].is_null());
    assert_eq!(contact["notes"], "Interesse");

    let response = h
        .server
        .patch("/api/outreach/contacts")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"venue_id": "be1", "campaign_id": campaign_id, "status": "form_submitted"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .patch("/api/outreach/contacts")
        .add_header(header::AUTHORIZATION, bearer())
        .text("{not json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Corps de requete invalide.");
}

#[tokio::test]
async fn test_send_batch_flow() {
    let h = harness();
    let created = create_campaign(&h, json!({"name": "Belgique", "target_filter": {"countries": ["BE"]}})).await;
    let campaign_id = created["campaign"]["id"].as_str().unwrap().to_string();

    let response = h
        .server
        .post("/api/outreach/send-batch")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"campaign_id": campaign_id, "max_count": 2}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let report = response.json::<Value>();
    assert_eq!(report["sent"], 2);
    assert_eq!(report["failed"], 0);

    {
        let sent = h.mailer.sent.lock();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].body.starts_with("https://example.org/inscription-lieu/"));
    }

    let response = h
        .server
        .post("/api/outreach/send-batch")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"campaign_id": campaign_id}))
        .await;
    assert_eq!(response.json::<Value>()["sent"], 1);

    let response = h
        .server
        .post("/api/outreach/send-batch")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"campaign_id": campaign_id}))
        .await;
    let report = response.json::<Value>();
    assert_eq!(report["sent"], 0);
    assert!(report["message"].is_string());

    let listed = h
        .server
        .get("/api/outreach/campaigns")
        .add_header(header::AUTHORIZATION, bearer())
        .await
        .json::<Value>();
    assert_eq!(listed["campaigns"][0]["status"], "active");
    assert_eq!(listed["campaigns"][0]["stats"]["sent"], 3);

    let stats = h
        .server
        .get("/api/outreach/stats")
        .add_header(header::AUTHORIZATION, bearer())
        .await
        .json::<Value>();
    assert_eq!(stats["stats"]["send_rate"], 100);
    assert_eq!(stats["stats"]["active_campaigns"], 1);
}

#[tokio::test]
async fn test_send_batch_without_generator() {
    let h = harness_with(|_| {}, false);
    let response = h
        .server
        .post("/api/outreach/send-batch")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"campaign_id": "c1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    let response = h
        .server
        .post("/api/outreach/generate-email")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"venue_name": "Le Moulin", "form_url": "https://example.org/f"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_generate_email() {
    let h = harness();
    let response = h
        .server
        .post("/api/outreach/generate-email")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"venue_name": "Le Moulin"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = h
        .server
        .post("/api/outreach/generate-email")
        .add_header(header::AUTHORIZATION, bearer())
        .json(&json!({"venue_name": "Le Moulin", "form_url": "https://example.org/f"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let email = response.json::<Value>();
    assert_eq!(email["subject"], "Invitation Le Moulin");
    assert_eq!(email["email"], "https://example.org/f");
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let h = harness_with(
        |config| {
            config.rate_limit.max_general = 2;
            config.rate_limit.max_ai = 1;
        },
        true,
    );
    let forwarded = HeaderName::from_static("x-forwarded-for");

    for _ in 0..2 {
        let response = h
            .server
            .get("/api/venue-submission/validate-token")
            .add_query_param("token", "t")
            .add_header(forwarded.clone(), HeaderValue::from_static("1.1.1.1"))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    let limited = h
        .server
        .get("/api/venue-submission/validate-token")
        .add_query_param("token", "t")
        .add_header(forwarded.clone(), HeaderValue::from_static("1.1.1.1, 10.0.0.1"))
        .await;
    assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().get(header::RETRY_AFTER).is_some());
    assert_eq!(
        limited.json::<Value>()["error"],
        "Trop de requêtes. Veuillez réessayer dans une minute."
    );

    // Another client keeps its own window.
    let other = h
        .server
        .get("/api/venue-submission/validate-token")
        .add_query_param("token", "t")
        .add_header(forwarded.clone(), HeaderValue::from_static("2.2.2.2"))
        .await;
    assert_eq!(other.status_code(), StatusCode::OK);

    // Health is not API traffic.
    assert_eq!(h.server.get("/health").await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_venue_submission_flow() {
    let h = harness();
    let created = create_campaign(&h, json!({"name": "Belgique", "target_filter": {"countries": ["BE"]}})).await;
    let campaign_id = created["campaign"]["id"].as_str().unwrap().to_string();
    let token = contacts(&h, &campaign_id).await[0]["form_token"]
        .as_str()
        .unwrap()
        .to_string();

    let missing = h.server.get("/api/venue-submission/validate-token").await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["valid"], false);

    let unknown = h
        .server
        .get("/api/venue-submission/validate-token")
        .add_query_param("token", "nope")
        .await;
    assert_eq!(unknown.status_code(), StatusCode::OK);
    assert_eq!(unknown.json::<Value>(), json!({"valid": false}));

    let valid = h
        .server
        .get("/api/venue-submission/validate-token")
        .add_query_param("token", &token)
        .await
        .json::<Value>();
    assert_eq!(valid["valid"], true);
    assert_eq!(valid["venue_id"], "be1");

    let form = json!({
        "name": "Lieu be1",
        "description": "Une grande ferme renovee au milieu des bois.",
        "country": "BE",
        "contact_email": "be1@example.org",
        "website": "https://be1.example.org"
    });

    let invalid = h
        .server
        .post("/api/venue-submission")
        .json(&json!({"token": token, "formData": {"name": "L"}}))
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert!(invalid.json::<Value>()["details"].as_array().unwrap().len() >= 3);

    let forbidden = h
        .server
        .post("/api/venue-submission")
        .json(&json!({"token": "nope", "formData": form}))
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

    let accepted = h
        .server
        .post("/api/venue-submission")
        .json(&json!({"token": token, "formData": form}))
        .await;
    assert_eq!(accepted.status_code(), StatusCode::OK);
    assert_eq!(accepted.json::<Value>()["success"], true);
    assert!(h.dir.path().join("submissions/be1.json").exists());

    let again = h
        .server
        .post("/api/venue-submission")
        .json(&json!({"token": token, "formData": form}))
        .await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);

    let used = h
        .server
        .get("/api/venue-submission/validate-token")
        .add_query_param("token", &token)
        .await
        .json::<Value>();
    assert_eq!(used["valid"], false);

    let contact = contacts(&h, &campaign_id)
        .await
        .into_iter()
        .find(|c| c["venue_id"] == "be1")
        .unwrap();
    assert_eq!(contact["status"], "form_submitted");
}

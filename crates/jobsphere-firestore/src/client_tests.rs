//! Client tests: error classification, env config, and HTTP behavior against
//! a mock Firestore endpoint.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobsphere_models::{ContactSubject, ListingDraft, ListingId, MediaKind, ValidContact};

use crate::client::{FirestoreClient, FirestoreConfig};
use crate::contacts_repo::ContactRepository;
use crate::error::FirestoreError;
use crate::listings_repo::ListingRepository;
use crate::retry::RetryConfig;

// =============================================================================
// Test Helpers
// =============================================================================

const DOCS: &str = "/v1/projects/test-project/databases/(default)/documents";

async fn client_for(server: &MockServer) -> FirestoreClient {
    let mut config = FirestoreConfig::emulator("test-project", server.address().to_string());
    config.timeout = Duration::from_secs(5);
    config.retry = RetryConfig {
        max_retries: 2,
        base_delay_ms: 10,
        max_delay_ms: 50,
    };
    FirestoreClient::new(config).await.unwrap()
}

fn listing_doc(id: &str, title: &str, created_at: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/test-project/databases/(default)/documents/jobs/{}", id),
        "fields": {
            "jobTitle": {"stringValue": title},
            "userId": {"stringValue": "uid-1"},
            "createdAt": {"timestampValue": created_at}
        }
    })
}

fn draft() -> ListingDraft {
    ListingDraft {
        job_title: "Backend Engineer".to_string(),
        company_name: "Innovatech".to_string(),
        description: "Build scalable APIs".to_string(),
        email: "sara@example.com".to_string(),
        address: "Karachi".to_string(),
        salary_package: "150k".to_string(),
        media_type: MediaKind::None,
        media_url: None,
    }
}

// =============================================================================
// Error Type Tests
// =============================================================================

#[test]
fn test_error_classification_by_status() {
    assert!(matches!(
        FirestoreError::from_http_status(401, "x"),
        FirestoreError::AuthError(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(403, "x"),
        FirestoreError::PermissionDenied(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(404, "x"),
        FirestoreError::NotFound(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(409, "x"),
        FirestoreError::AlreadyExists(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(400, "x"),
        FirestoreError::RequestFailed(_)
    ));
    assert!(matches!(
        FirestoreError::from_http_status(503, "x"),
        FirestoreError::ServerError(503, _)
    ));
}

#[test]
fn test_only_transient_errors_are_retryable() {
    assert!(FirestoreError::from_http_status(429, "x").is_retryable());
    assert!(FirestoreError::from_http_status(500, "x").is_retryable());
    assert!(!FirestoreError::from_http_status(400, "x").is_retryable());
    assert!(!FirestoreError::from_http_status(403, "x").is_retryable());
    assert!(!FirestoreError::from_http_status(404, "x").is_retryable());
}

#[test]
fn test_error_status_and_retry_after() {
    assert_eq!(FirestoreError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(FirestoreError::RateLimited(2500).retry_after_ms(), Some(2500));
    assert_eq!(
        FirestoreError::ServerError(502, "bad gateway".into()).http_status(),
        Some(502)
    );
    assert_eq!(FirestoreError::invalid_response("x").http_status(), None);
}

// =============================================================================
// Config Tests
// =============================================================================

fn clear_firestore_env() {
    for key in [
        "GCP_PROJECT_ID",
        "FIREBASE_PROJECT_ID",
        "FIRESTORE_DATABASE_ID",
        "FIRESTORE_EMULATOR_HOST",
        "FIRESTORE_CONNECT_TIMEOUT_SECS",
        "FIRESTORE_RETRY_BASE_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_config_requires_project_id() {
    clear_firestore_env();
    assert!(FirestoreConfig::from_env().is_err());

    std::env::set_var("GCP_PROJECT_ID", "  ");
    assert!(FirestoreConfig::from_env().is_err());
    clear_firestore_env();
}

#[test]
#[serial]
fn test_config_defaults_and_fallback_project() {
    clear_firestore_env();
    std::env::set_var("FIREBASE_PROJECT_ID", "jobsphere-dev");
    std::env::set_var("FIRESTORE_CONNECT_TIMEOUT_SECS", "not-a-number");

    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "jobsphere-dev");
    assert_eq!(config.database_id, "(default)");
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    assert!(config.emulator_host.is_none());
    clear_firestore_env();
}

#[test]
#[serial]
fn test_config_reads_emulator_and_retry_settings() {
    clear_firestore_env();
    std::env::set_var("GCP_PROJECT_ID", "jobsphere");
    std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");
    std::env::set_var("FIRESTORE_RETRY_BASE_MS", "50");

    let config = FirestoreConfig::from_env().unwrap();
    assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
    assert_eq!(config.retry.base_delay_ms, 50);
    clear_firestore_env();
}

#[tokio::test]
async fn test_full_document_name() {
    let client = FirestoreClient::new(FirestoreConfig::emulator("p1", "localhost:8080"))
        .await
        .unwrap();
    assert_eq!(
        client.full_document_name("jobs", "j1"),
        "projects/p1/databases/(default)/documents/jobs/j1"
    );
}

// =============================================================================
// HTTP Behavior
// =============================================================================

#[tokio::test]
async fn test_get_listing_and_missing_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/j1", DOCS)))
        .and(header("authorization", "Bearer owner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_doc(
            "j1",
            "Backend Engineer",
            "2025-03-01T10:00:00Z",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/gone", DOCS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);

    let listing = repo.get(&ListingId::from("j1")).await.unwrap().unwrap();
    assert_eq!(listing.title.as_deref(), Some("Backend Engineer"));
    assert!(listing.is_owned_by("uid-1"));

    assert!(repo.get(&ListingId::from("gone")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_listing_uses_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/jobs", DOCS)))
        .and(body_partial_json(json!({
            "fields": {
                "jobTitle": {"stringValue": "Backend Engineer"},
                "userId": {"stringValue": "uid-7"},
                "createdBy": {"stringValue": "sara"},
                "mediaType": {"stringValue": "none"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/test-project/databases/(default)/documents/jobs/auto123",
            "fields": {
                "jobTitle": {"stringValue": "Backend Engineer"},
                "userId": {"stringValue": "uid-7"},
                "createdBy": {"stringValue": "sara"},
                "createdAt": {"timestampValue": "2025-03-01T10:00:00Z"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let listing = repo.create(&draft(), "uid-7", "sara").await.unwrap();

    assert_eq!(listing.id.as_str(), "auto123");
    assert_eq!(listing.created_by.as_deref(), Some("sara"));
}

#[tokio::test]
async fn test_update_missing_listing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/jobs/j404", DOCS)))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let err = repo.update(&ListingId::from("j404"), &draft()).await.unwrap_err();
    assert!(matches!(err, FirestoreError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/jobs/j1", DOCS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    repo.delete(&ListingId::from("j1")).await.unwrap();
}

#[tokio::test]
async fn test_list_recent_skips_read_time_entries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredQuery": {"from": [{"collectionId": "jobs"}], "limit": 20}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": listing_doc("j2", "Newer", "2025-03-02T10:00:00Z"), "readTime": "2025-03-03T00:00:00Z"},
            {"document": listing_doc("j1", "Older", "2025-03-01T10:00:00Z"), "readTime": "2025-03-03T00:00:00Z"},
            {"readTime": "2025-03-03T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let listings = repo.list_recent(20).await.unwrap();

    let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["j2", "j1"]);
}

#[tokio::test]
async fn test_list_recent_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    assert!(repo.list_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_by_owner_sorts_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredQuery": {"where": {"fieldFilter": {"value": {"stringValue": "uid-1"}}}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": listing_doc("a", "Old", "2025-01-01T00:00:00Z")},
            {"document": listing_doc("b", "New", "2025-02-01T00:00:00Z")}
        ])))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let listings = repo.list_by_owner("uid-1", 50).await.unwrap();
    assert_eq!(listings[0].id.as_str(), "b");
    assert_eq!(listings[1].id.as_str(), "a");
}

#[tokio::test]
async fn test_list_all_reads_every_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "limit": 2,
                "startAt": {
                    "values": [
                        {"timestampValue": "2025-03-02T10:00:00Z"},
                        {"referenceValue": "projects/test-project/databases/(default)/documents/jobs/j2"}
                    ],
                    "before": false
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": listing_doc("j1", "Oldest", "2025-03-01T10:00:00Z")}
        ])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({"structuredQuery": {"limit": 2}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": listing_doc("j3", "Newest", "2025-03-03T10:00:00Z")},
            {"document": listing_doc("j2", "Middle", "2025-03-02T10:00:00Z")}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let listings = repo.list_all(2).await.unwrap();

    let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["j3", "j2", "j1"]);
}

#[tokio::test]
async fn test_list_all_stops_on_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .and(body_partial_json(json!({"structuredQuery": {"startAt": {"before": false}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"readTime": "2025-03-03T00:00:00Z"}
        ])))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": listing_doc("j1", "Only", "2025-03-01T10:00:00Z")}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let listings = repo.list_all(1).await.unwrap();
    assert_eq!(listings.len(), 1);
}

#[tokio::test]
async fn test_list_by_owner_keeps_newest_within_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"document": listing_doc("a", "Oldest", "2025-01-01T00:00:00Z")},
            {"document": listing_doc("b", "Newest", "2025-03-01T00:00:00Z")},
            {"document": listing_doc("c", "Middle", "2025-02-01T00:00:00Z")}
        ])))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let listings = repo.list_by_owner("uid-1", 2).await.unwrap();

    let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[tokio::test]
async fn test_permission_denied_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:runQuery", DOCS)))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let err = repo.list_recent(10).await.unwrap_err();
    assert!(matches!(err, FirestoreError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_unauthorized_without_expiry_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/jobs/j1", DOCS)))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let repo = ListingRepository::new(client_for(&server).await);
    let err = repo.get(&ListingId::from("j1")).await.unwrap_err();
    assert!(matches!(err, FirestoreError::AuthError(_)));
}

#[tokio::test]
async fn test_create_contact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/contacts", DOCS)))
        .and(body_partial_json(json!({
            "fields": {
                "subject": {"stringValue": "Other"},
                "status": {"stringValue": "New"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/test-project/databases/(default)/documents/contacts/c1",
            "fields": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ContactRepository::new(client_for(&server).await);
    let record = repo
        .create(ValidContact {
            name: "Ali".to_string(),
            email: "ali@example.com".to_string(),
            phone: String::new(),
            subject: ContactSubject::Other,
            message: "Hello".to_string(),
            user_id: None,
        })
        .await
        .unwrap();

    assert_eq!(record.id, "c1");
    assert_eq!(record.name, "Ali");
}

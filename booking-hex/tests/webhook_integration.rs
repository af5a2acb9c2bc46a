//! Integration tests for the payment webhook route.
//!
//! These drive the full router over an in-memory SQLite store and observe the
//! results through the admin listings.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use booking_hex::inbound::{HttpServer, SIGNATURE_HEADER, WebhookVerification};
use booking_hex::{BookingService, BookingSettings};
use booking_repo::SqliteRepo;
use booking_repo::security::signature_header;
use booking_types::{BookingRepository, Role, ServiceCatalog, User};

const SECRET: &str = "whsec_integration";

/// Test app plus a session token for an admin.
struct TestApp {
    app: Router,
    admin_token: String,
}

async fn create_test_app(webhook: WebhookVerification) -> TestApp {
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    repo.upsert_user(&User::new("u1", Some("Hanako".into()), "hanako@example.com"))
        .await
        .unwrap();
    let admin = User::new("admin", Some("Owner".into()), "owner@example.com").with_role(Role::Admin);
    repo.upsert_user(&admin).await.unwrap();
    let admin_token = repo
        .create_session(&admin.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    let service = BookingService::new(repo, ServiceCatalog::default(), BookingSettings::default());
    let app = HttpServer::new(service, webhook).router();

    TestApp { app, admin_token }
}

fn completed_event(session_id: &str, metadata: Value) -> String {
    json!({
        "id": format!("evt_{session_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "amount_total": 5000,
                "currency": "jpy",
                "metadata": metadata,
            }
        }
    })
    .to_string()
}

fn cut_metadata() -> Value {
    json!({
        "userId": "u1",
        "serviceId": "cut",
        "reservationDate": "2024-05-01T10:00:00Z",
        "serviceDuration": "60",
    })
}

fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/webhook")
        .header("Content-Type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn admin_get(test: &TestApp, uri: &str) -> Value {
    let request = Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", test.admin_token))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&test.app, request).await;
    assert_eq!(status, StatusCode::OK, "{uri}: {json}");
    json
}

async fn reservations(test: &TestApp) -> Vec<Value> {
    admin_get(test, "/api/admin/reservations")
        .await
        .as_array()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_completed_event_creates_one_reservation() {
    let test = create_test_app(WebhookVerification::default()).await;

    let body = completed_event("cs_1", cut_metadata());
    let (status, json) = send(&test.app, webhook_request(&body, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "received": true }));

    let listed = reservations(&test).await;
    assert_eq!(listed.len(), 1);
    let reservation = &listed[0];
    assert_eq!(reservation["customer_name"], "Hanako");
    assert_eq!(reservation["service_name"], "Hair Cut");
    assert_eq!(reservation["status"], "CONFIRMED");
    assert_eq!(reservation["stripe_session_id"], "cs_1");
    assert_eq!(
        reservation["start_time"].as_str().unwrap().parse::<chrono::DateTime<Utc>>().unwrap(),
        "2024-05-01T10:00:00Z".parse::<chrono::DateTime<Utc>>().unwrap()
    );
    assert_eq!(
        reservation["end_time"].as_str().unwrap().parse::<chrono::DateTime<Utc>>().unwrap(),
        "2024-05-01T11:00:00Z".parse::<chrono::DateTime<Utc>>().unwrap()
    );
}

#[tokio::test]
async fn test_service_row_materialized_before_insert() {
    let test = create_test_app(WebhookVerification::default()).await;

    let body = completed_event("cs_1", cut_metadata());
    send(&test.app, webhook_request(&body, None)).await;

    let request = Request::builder()
        .uri("/api/services")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&test.app, request).await;

    // Only the materialized service is stored now
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([{ "id": "cut", "name": "Hair Cut", "price": 5000, "duration": 60 }]));
}

#[tokio::test]
async fn test_incomplete_metadata_is_acknowledged_without_reservation() {
    let test = create_test_app(WebhookVerification::default()).await;

    for missing in ["userId", "serviceId", "reservationDate"] {
        let mut metadata = cut_metadata();
        metadata.as_object_mut().unwrap().remove(missing);
        let body = completed_event("cs_1", metadata);

        let (status, json) = send(&test.app, webhook_request(&body, None)).await;

        assert_eq!(status, StatusCode::OK, "missing {missing}");
        assert_eq!(json["received"], true);
    }

    assert!(reservations(&test).await.is_empty());
}

#[tokio::test]
async fn test_other_event_types_are_acknowledged() {
    let test = create_test_app(WebhookVerification::default()).await;
    let body = json!({
        "id": "evt_refund",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1" } }
    })
    .to_string();

    let (status, json) = send(&test.app, webhook_request(&body, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
    assert!(reservations(&test).await.is_empty());
}

#[tokio::test]
async fn test_unparseable_body_is_rejected() {
    let test = create_test_app(WebhookVerification::default()).await;

    let (status, json) = send(&test.app, webhook_request("{not json", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("JSON Parse Error"));
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn test_duplicate_delivery_keeps_one_row() {
    let test = create_test_app(WebhookVerification::default()).await;
    let body = completed_event("cs_1", cut_metadata());

    for _ in 0..2 {
        let (status, _) = send(&test.app, webhook_request(&body, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(reservations(&test).await.len(), 1);
}

#[tokio::test]
async fn test_valid_signature_is_accepted() {
    let test = create_test_app(WebhookVerification::signed(SECRET, 300)).await;
    let body = completed_event("cs_1", cut_metadata());
    let signature = signature_header(body.as_bytes(), Utc::now().timestamp(), SECRET);

    let (status, json) = send(&test.app, webhook_request(&body, Some(&signature))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], true);
    assert_eq!(reservations(&test).await.len(), 1);
}

#[tokio::test]
async fn test_bad_signature_is_rejected_without_reservation() {
    let test = create_test_app(WebhookVerification::signed(SECRET, 300)).await;
    let body = completed_event("cs_1", cut_metadata());
    let forged = signature_header(body.as_bytes(), Utc::now().timestamp(), "whsec_wrong");

    for signature in [Some(forged.as_str()), Some("t=1,v1=00"), None] {
        let (status, json) = send(&test.app, webhook_request(&body, signature)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{signature:?}");
        assert!(json["error"].as_str().unwrap().starts_with("Webhook Error"));
    }

    assert!(reservations(&test).await.is_empty());
}

#[tokio::test]
async fn test_stale_signature_is_rejected() {
    let test = create_test_app(WebhookVerification::signed(SECRET, 300)).await;
    let body = completed_event("cs_1", cut_metadata());
    let stale = signature_header(body.as_bytes(), Utc::now().timestamp() - 3600, SECRET);

    let (status, _) = send(&test.app, webhook_request(&body, Some(&stale))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_service_is_dead_lettered() {
    let test = create_test_app(WebhookVerification::default()).await;
    let mut metadata = cut_metadata();
    metadata["serviceId"] = json!("perm");
    let body = completed_event("cs_9", metadata);

    let (status, _) = send(&test.app, webhook_request(&body, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(reservations(&test).await.is_empty());

    let letters = admin_get(&test, "/api/admin/dead-letters").await;
    assert_eq!(letters.as_array().unwrap().len(), 1);
    assert_eq!(letters[0]["stage"], "insert_reservation");
    assert_eq!(letters[0]["event_id"], "evt_cs_9");
}

#[tokio::test]
async fn test_webhook_liveness_probe() {
    let test = create_test_app(WebhookVerification::default()).await;
    let request = Request::builder()
        .uri("/api/webhook")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(&test.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "status": "ok", "endpoint": "webhook" }));
}

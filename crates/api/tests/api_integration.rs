//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::routes::bookings::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain::InMemoryBookingRepository;
use messaging::{InMemoryChannel, NOTIFICATION_QUEUE};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    BookingOrchestrator, InMemoryIdentityService, InMemorySchedulingService, User, UserRole,
};
use tower::ServiceExt;
use tracking::InMemoryTracker;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    repository: InMemoryBookingRepository,
    identity: InMemoryIdentityService,
    scheduling: InMemorySchedulingService,
    channel: InMemoryChannel,
}

fn setup() -> TestApp {
    let repository = InMemoryBookingRepository::new();
    let identity = InMemoryIdentityService::new();
    let scheduling = InMemorySchedulingService::new();
    let channel = InMemoryChannel::new();
    let tracker = InMemoryTracker::new();

    identity.insert(
        UserRole::Student,
        User {
            id: "S1".to_string(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        },
    );
    identity.insert(
        UserRole::Tutor,
        User {
            id: "T1".to_string(),
            full_name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
        },
    );

    let orchestrator = BookingOrchestrator::new(
        repository.clone(),
        identity.clone(),
        scheduling.clone(),
        channel.clone(),
        Arc::new(tracker),
    );
    let state = Arc::new(AppState { orchestrator });
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        repository,
        identity,
        scheduling,
        channel,
    }
}

fn booking_request(tutor_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("content-type", "application/json")
        .header("x-correlation-id", "cid-api-test")
        .body(Body::from(
            serde_json::json!({
                "studentId": "S1",
                "tutorId": tutor_id,
                "subject": "Algebra",
                "scheduledAt": "2025-01-01T10:00:00Z",
                "durationMinutes": 60
            })
            .to_string(),
        ))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_booking_confirms_and_echoes_correlation_id() {
    let t = setup();

    let response = t.app.oneshot(booking_request("T1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response
            .headers()
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok()),
        Some("cid-api-test")
    );

    let json = body_json(response).await;
    assert_eq!(json["state"], "CONFIRMED");
    assert_eq!(json["studentId"], "S1");
    assert_eq!(json["tutorId"], "T1");
    assert_eq!(json["reservationId"], "RES-0001");
    assert!(json["failureReason"].is_null());

    // The saga published exactly one notification.
    assert_eq!(t.channel.pending_count(NOTIFICATION_QUEUE).await, 1);
}

#[tokio::test]
async fn test_unknown_tutor_is_404() {
    let t = setup();

    let response = t.app.oneshot(booking_request("T404")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("tutor T404 not found")
    );
    assert_eq!(t.repository.booking_count(), 0);
}

#[tokio::test]
async fn test_unavailable_slot_is_409() {
    let t = setup();
    t.scheduling.set_unavailable(true);

    let response = t.app.oneshot(booking_request("T1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reservation_failure_is_500_with_original_cause() {
    let t = setup();
    t.scheduling.set_fail_on_reserve(true);

    let response = t.app.oneshot(booking_request("T1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("could not be completed"));
    assert!(message.contains("connection refused"));

    // The failure outcome was still persisted.
    assert_eq!(t.repository.booking_count(), 1);
}

#[tokio::test]
async fn test_identity_outage_is_500() {
    let t = setup();
    t.identity.set_fail_on_lookup(true);

    let response = t.app.oneshot(booking_request("T1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_zero_duration_is_rejected() {
    let t = setup();

    let request = Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "studentId": "S1",
                "tutorId": "T1",
                "subject": "Algebra",
                "scheduledAt": "2025-01-01T10:00:00Z",
                "durationMinutes": 0
            })
            .to_string(),
        ))
        .unwrap();

    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let t = setup();

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

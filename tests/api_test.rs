use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

use estateserver::admin::DEFAULT_ADMIN_PASSWORD;
use estateserver::api_router;
use estateserver::config::{AppConfig, DatabaseConfig, ServerConfig, SmtpConfig, StoreBackend};
use estateserver::notifier::{Notifier, NotifyError};
use estateserver::shared::state::AppState;
use estateserver::store::MemStore;

#[derive(Default)]
struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Smtp("simulated provider outage".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: String::new(),
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "no-reply@test.example".to_string(),
            inbox: "sales@test.example".to_string(),
        },
        session_secret: "test-secret".to_string(),
        store_backend: StoreBackend::Memory,
    }
}

fn test_app(notifier: Arc<dyn Notifier>) -> Router {
    let state = Arc::new(AppState {
        config: test_config(),
        store: Arc::new(MemStore::new()),
        notifier,
    });
    api_router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/admin/verify-password",
        None,
        Some(json!({ "password": DEFAULT_ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
    body["token"].as_str().unwrap().to_string()
}

fn has_issue(body: &Value, field: &str) -> bool {
    body["issues"]
        .as_array()
        .map(|issues| issues.iter().any(|i| i["field"] == field))
        .unwrap_or(false)
}

#[tokio::test]
async fn booking_returns_created_record_with_email_status() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = test_app(notifier.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/site-visits",
        None,
        Some(json!({ "name": "Asha Rao", "mobile": "9876543210" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["visit"]["id"].as_str().is_some());
    assert_eq!(body["visit"]["mobile"], "9876543210");
    assert_eq!(body["email_status"]["user_notified"], json!(false));
    assert_eq!(body["email_status"]["admin_notified"], json!(true));

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "sales@test.example");
}

#[tokio::test]
async fn booking_with_email_notifies_visitor_too() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = test_app(notifier.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/api/site-visits",
        None,
        Some(json!({
            "name": "Asha Rao",
            "mobile": "+91 98765-43210",
            "email": "asha@example.com",
            "preferred_date": "2025-02-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email_status"]["user_notified"], json!(true));
    assert_eq!(body["email_status"]["admin_notified"], json!(true));
    // Formatting characters are stripped before persisting.
    assert_eq!(body["visit"]["mobile"], "+919876543210");

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "asha@example.com");
}

#[tokio::test]
async fn booking_rejects_invalid_mobile() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let (status, body) = send(
        &app,
        "POST",
        "/api/site-visits",
        None,
        Some(json!({ "name": "Bob", "mobile": "12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "mobile"));
}

#[tokio::test]
async fn booking_survives_notification_outage() {
    let app = test_app(Arc::new(RecordingNotifier::failing()));
    let (status, body) = send(
        &app,
        "POST",
        "/api/site-visits",
        None,
        Some(json!({
            "name": "Asha Rao",
            "mobile": "9876543210",
            "email": "asha@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email_status"]["user_notified"], json!(false));
    assert_eq!(body["email_status"]["admin_notified"], json!(false));
}

#[tokio::test]
async fn identical_bookings_get_distinct_ids() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let payload = json!({ "name": "Asha Rao", "mobile": "9876543210" });
    let (_, first) = send(&app, "POST", "/api/site-visits", None, Some(payload.clone())).await;
    let (_, second) = send(&app, "POST", "/api/site-visits", None, Some(payload)).await;
    assert_ne!(first["visit"]["id"], second["visit"]["id"]);
}

#[tokio::test]
async fn staff_routes_require_a_session_token() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let (status, _) = send(&app, "GET", "/api/leads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/leads", Some("forged-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/testimonials",
        None,
        Some(json!({
            "name": "X", "location": "Y", "investment": "1", "plot_size": "2",
            "returns": "3", "duration": "4", "review": "Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/verify-password",
        None,
        Some(json!({ "password": "guess" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lead_crud_round_trip() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (status, lead) = send(
        &app,
        "POST",
        "/api/leads",
        Some(&token),
        Some(json!({
            "first_name": "Asha",
            "last_name": "Rao",
            "email": "asha@example.com",
            "phone": "9876543210"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lead["status"], "new");
    let id = lead["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, "GET", "/api/leads?search=asha", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/leads/{id}"),
        Some(&token),
        Some(json!({ "status": "qualified" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "qualified");
    assert_eq!(updated["first_name"], "Asha");

    let (status, _) = send(&app, "DELETE", &format!("/api/leads/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/api/leads/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn appointment_scheduling_flow() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (_, lead) = send(
        &app,
        "POST",
        "/api/leads",
        Some(&token),
        Some(json!({
            "first_name": "Asha",
            "last_name": "Rao",
            "email": "asha@example.com",
            "phone": "9876543210"
        })),
    )
    .await;
    let lead_id = lead["id"].as_str().unwrap().to_string();

    // Server combines date and time into one timestamp.
    let (status, appt) = send(
        &app,
        "POST",
        "/api/appointments",
        Some(&token),
        Some(json!({
            "lead_id": lead_id,
            "title": "Site tour",
            "appointment_date": "2025-01-10",
            "appointment_time": "10:00",
            "duration": 60,
            "location": "Site office",
            "status": "scheduled"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let when = appt["appointment_date"].as_str().unwrap();
    assert!(when.starts_with("2025-01-10T10:00:00"), "got {when}");
    assert_eq!(appt["duration_minutes"], 60);
    let id = appt["id"].as_str().unwrap().to_string();

    // Status-only update leaves the timestamp untouched.
    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/appointments/{id}"),
        Some(&token),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["appointment_date"], appt["appointment_date"]);

    let (status, filtered) = send(
        &app,
        "GET",
        "/api/appointments?status=completed",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/appointments/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/appointments/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn appointment_validation_rules() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (_, lead) = send(
        &app,
        "POST",
        "/api/leads",
        Some(&token),
        Some(json!({
            "first_name": "Asha",
            "last_name": "Rao",
            "email": "asha@example.com",
            "phone": "9876543210"
        })),
    )
    .await;
    let lead_id = lead["id"].as_str().unwrap().to_string();

    // Too-short duration.
    let (status, body) = send(
        &app,
        "POST",
        "/api/appointments",
        Some(&token),
        Some(json!({
            "lead_id": lead_id,
            "title": "Site tour",
            "appointment_date": "2025-01-10",
            "appointment_time": "10:00",
            "duration": 10,
            "location": "Site office",
            "status": "scheduled"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "duration"));

    // Unknown lead.
    let (status, body) = send(
        &app,
        "POST",
        "/api/appointments",
        Some(&token),
        Some(json!({
            "lead_id": "00000000-0000-0000-0000-000000000000",
            "title": "Site tour",
            "appointment_date": "2025-01-10",
            "appointment_time": "10:00",
            "location": "Site office",
            "status": "scheduled"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "lead_id"));

    // Missing required fields are all reported.
    let (status, body) = send(
        &app,
        "POST",
        "/api/appointments",
        Some(&token),
        Some(json!({ "lead_id": lead_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["title", "location", "status", "appointment_date", "appointment_time"] {
        assert!(has_issue(&body, field), "missing issue for {field}");
    }

    // Unknown status string.
    let (status, body) = send(
        &app,
        "POST",
        "/api/appointments",
        Some(&token),
        Some(json!({
            "lead_id": lead_id,
            "title": "Site tour",
            "appointment_date": "2025-01-10",
            "appointment_time": "10:00",
            "location": "Site office",
            "status": "done"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "status"));
}

#[tokio::test]
async fn change_password_flow() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/change-password",
        Some(&token),
        Some(json!({
            "current_password": DEFAULT_ADMIN_PASSWORD,
            "new_password": "tiny"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "new_password"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/change-password",
        Some(&token),
        Some(json!({
            "current_password": DEFAULT_ADMIN_PASSWORD,
            "new_password": "khushalipur-2025"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old password no longer verifies; the new one does.
    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/verify-password",
        None,
        Some(json!({ "password": DEFAULT_ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/verify-password",
        None,
        Some(json!({ "password": "khushalipur-2025" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(true));
}

#[tokio::test]
async fn brochure_download_flow() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (status, brochure) = send(
        &app,
        "POST",
        "/api/admin/brochures",
        Some(&token),
        Some(json!({
            "title": "Khushalipur master plan",
            "file_url": "/assets/brochures/master-plan.pdf"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let brochure_id = brochure["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, "GET", "/api/brochures", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Unknown brochure id.
    let (status, _) = send(
        &app,
        "POST",
        "/api/brochures/00000000-0000-0000-0000-000000000000/download",
        None,
        Some(json!({ "user_name": "Asha", "user_email": "asha@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Missing lead-capture fields.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/brochures/{brochure_id}/download"),
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "user_name"));
    assert!(has_issue(&body, "user_email"));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/brochures/{brochure_id}/download"),
        None,
        Some(json!({ "user_name": "Asha", "user_email": "asha@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["download_url"], "/assets/brochures/master-plan.pdf");

    let (status, stats) = send(&app, "GET", "/api/admin/brochure-stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_downloads"], 1);
    assert_eq!(stats["brochures"][0]["downloads"], 1);

    let (_, downloads) = send(
        &app,
        "GET",
        "/api/admin/brochure-downloads",
        Some(&token),
        None,
    )
    .await;
    let download_id = downloads[0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/brochure-downloads/{download_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, stats) = send(&app, "GET", "/api/admin/brochure-stats", Some(&token), None).await;
    assert_eq!(stats["total_downloads"], 0);
}

#[tokio::test]
async fn activity_feed_flow() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/activities",
        Some(&token),
        Some(json!({
            "title": "New inquiry",
            "description": "Plot inquiry from Dehradun",
            "activity_type": "party"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(has_issue(&body, "activity_type"));

    let (status, activity) = send(
        &app,
        "POST",
        "/api/admin/activities",
        Some(&token),
        Some(json!({
            "title": "New inquiry",
            "description": "Plot inquiry from Dehradun",
            "activity_type": "inquiry"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = activity["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, "GET", "/api/activities", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // A just-created activity is inside the recent window.
    let (status, recent) = send(&app, "GET", "/api/activities/recent", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/admin/activities/{id}"),
        Some(&token),
        Some(json!({ "title": "Inquiry followed up" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Inquiry followed up");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/activities/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn testimonial_crud_round_trip() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (status, testimonial) = send(
        &app,
        "POST",
        "/api/admin/testimonials",
        Some(&token),
        Some(json!({
            "name": "Rajesh Kumar",
            "location": "Delhi",
            "investment": "5 Lakh",
            "plot_size": "200 sq yd",
            "returns": "40%",
            "duration": "2 years",
            "review": "Smooth process end to end."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = testimonial["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, "GET", "/api/testimonials", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/admin/testimonials/{id}"),
        Some(&token),
        Some(json!({ "returns": "45%" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["returns"], "45%");
    assert_eq!(updated["name"], "Rajesh Kumar");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/testimonials/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/testimonials/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn site_visit_admin_listing_and_deletion() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    let (_, booked) = send(
        &app,
        "POST",
        "/api/site-visits",
        None,
        Some(json!({ "name": "Asha Rao", "mobile": "9876543210" })),
    )
    .await;
    let id = booked["visit"]["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, "GET", "/api/admin/site-visits", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/site-visits/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/site-visits/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn crm_stats_reflect_stored_rows() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let token = login(&app).await;

    send(
        &app,
        "POST",
        "/api/site-visits",
        None,
        Some(json!({ "name": "Asha Rao", "mobile": "9876543210" })),
    )
    .await;
    let (_, lead) = send(
        &app,
        "POST",
        "/api/leads",
        Some(&token),
        Some(json!({
            "first_name": "Asha",
            "last_name": "Rao",
            "email": "asha@example.com",
            "phone": "9876543210"
        })),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/appointments",
        Some(&token),
        Some(json!({
            "lead_id": lead["id"],
            "title": "Site tour",
            "appointment_date": "2099-01-10",
            "appointment_time": "10:00",
            "location": "Site office",
            "status": "scheduled"
        })),
    )
    .await;

    let (status, stats) = send(&app, "GET", "/api/crm/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_leads"], 1);
    assert_eq!(stats["total_appointments"], 1);
    assert_eq!(stats["total_site_visits"], 1);
    assert_eq!(stats["upcoming_appointments"], 1);
    assert_eq!(stats["appointments_by_status"]["scheduled"], 1);
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let app = test_app(Arc::new(RecordingNotifier::default()));
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::notifier::EmailStatus;
use crate::shared::error::ApiError;
use crate::shared::schema::site_visits;
use crate::shared::state::AppState;
use crate::shared::validation::{
    is_valid_email, is_valid_indian_mobile, normalize_mobile, validate_required, ValidationError,
    ValidationResult,
};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = site_visits)]
pub struct SiteVisit {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub preferred_date: Option<String>,
    pub plot_size: Option<String>,
    pub budget: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSiteVisit {
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub preferred_date: Option<String>,
    pub plot_size: Option<String>,
    pub budget: Option<String>,
}

// Required fields are Option here so a missing field surfaces in the issue
// list instead of a body-deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct BookVisitRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub preferred_date: Option<String>,
    pub plot_size: Option<String>,
    pub budget: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookVisitResponse {
    pub visit: SiteVisit,
    pub email_status: EmailStatus,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    })
}

fn validate_booking(req: BookVisitRequest) -> Result<NewSiteVisit, Vec<ValidationError>> {
    let mut result = ValidationResult::new();

    let name = req.name.unwrap_or_default();
    if let Err(e) = validate_required(&name, "name") {
        result.add_error(e);
    }

    let mobile = req.mobile.unwrap_or_default();
    if mobile.trim().is_empty() {
        result.add_error(ValidationError::Required("mobile".to_string()));
    } else if !is_valid_indian_mobile(&mobile) {
        result.add_error(ValidationError::InvalidMobile {
            field: "mobile".to_string(),
        });
    }

    let email = non_empty(req.email);
    if let Some(ref email) = email {
        if !is_valid_email(email) {
            result.add_error(ValidationError::InvalidEmail {
                field: "email".to_string(),
            });
        }
    }

    result.into_result()?;

    Ok(NewSiteVisit {
        name: name.trim().to_string(),
        mobile: normalize_mobile(&mobile),
        email,
        preferred_date: non_empty(req.preferred_date),
        plot_size: non_empty(req.plot_size),
        budget: non_empty(req.budget),
    })
}

fn confirmation_body(visit: &SiteVisit) -> String {
    format!(
        "Dear {},\n\nThank you for booking a site visit to Khushalipur. \
         Our team will call you on {} to confirm the schedule{}.\n\n\
         Warm regards,\nFelicity Hills",
        visit.name,
        visit.mobile,
        visit
            .preferred_date
            .as_deref()
            .map(|d| format!(" (preferred date: {d})"))
            .unwrap_or_default(),
    )
}

fn alert_body(visit: &SiteVisit) -> String {
    format!(
        "New site visit booking\n\nName: {}\nMobile: {}\nEmail: {}\nPreferred date: {}\n\
         Plot size: {}\nBudget: {}",
        visit.name,
        visit.mobile,
        visit.email.as_deref().unwrap_or("-"),
        visit.preferred_date.as_deref().unwrap_or("-"),
        visit.plot_size.as_deref().unwrap_or("-"),
        visit.budget.as_deref().unwrap_or("-"),
    )
}

pub async fn book_site_visit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookVisitRequest>,
) -> Result<(StatusCode, Json<BookVisitResponse>), ApiError> {
    let new = validate_booking(req)?;
    let visit = state.store.create_site_visit(new).await?;

    // The booking is committed; notification failures are logged, never raised.
    let mut email_status = EmailStatus {
        user_notified: false,
        admin_notified: false,
    };
    if let Some(email) = visit.email.as_deref() {
        match state
            .notifier
            .send(
                email,
                "Your Khushalipur site visit request",
                &confirmation_body(&visit),
            )
            .await
        {
            Ok(()) => email_status.user_notified = true,
            Err(e) => warn!("visitor confirmation email to {email} failed: {e}"),
        }
    }
    match state
        .notifier
        .send(
            &state.config.smtp.inbox,
            "New site visit booking",
            &alert_body(&visit),
        )
        .await
    {
        Ok(()) => email_status.admin_notified = true,
        Err(e) => warn!("admin alert email failed: {e}"),
    }

    Ok((
        StatusCode::CREATED,
        Json(BookVisitResponse {
            visit,
            email_status,
        }),
    ))
}

pub async fn list_site_visits(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SiteVisit>>, ApiError> {
    Ok(Json(state.store.list_site_visits().await?))
}

pub async fn delete_site_visit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_site_visit(id).await? {
        return Err(ApiError::not_found("Site visit"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/site-visits", post(book_site_visit))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/site-visits", get(list_site_visits))
        .route("/api/admin/site-visits/:id", delete(delete_site_visit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: Option<&str>, mobile: Option<&str>, email: Option<&str>) -> BookVisitRequest {
        BookVisitRequest {
            name: name.map(String::from),
            mobile: mobile.map(String::from),
            email: email.map(String::from),
            preferred_date: None,
            plot_size: None,
            budget: None,
        }
    }

    #[test]
    fn accepts_valid_booking_and_normalizes_mobile() {
        let new = validate_booking(request(Some("Asha Rao"), Some("98765 43210"), None)).unwrap();
        assert_eq!(new.mobile, "9876543210");
        assert_eq!(new.name, "Asha Rao");
        assert!(new.email.is_none());
    }

    #[test]
    fn rejects_invalid_mobile_with_mobile_issue() {
        let issues = validate_booking(request(Some("Bob"), Some("12345"), None)).unwrap_err();
        assert!(issues.iter().any(|e| e.field() == "mobile"));
    }

    #[test]
    fn rejects_bad_email_even_with_valid_mobile() {
        let issues =
            validate_booking(request(Some("Asha"), Some("9876543210"), Some("nope"))).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field(), "email");
    }

    #[test]
    fn missing_name_and_mobile_both_reported() {
        let issues = validate_booking(request(None, None, None)).unwrap_err();
        let fields: Vec<_> = issues.iter().map(|e| e.field()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"mobile"));
    }

    #[test]
    fn blank_email_treated_as_absent() {
        let new = validate_booking(request(Some("Asha"), Some("9876543210"), Some("  "))).unwrap();
        assert!(new.email.is_none());
    }
}

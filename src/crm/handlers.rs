use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use crate::shared::validation::{is_valid_email, validate_required, ValidationError, ValidationResult};

use super::types::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, CreateLeadRequest, CrmStats, Lead,
    ListFilter, NewAppointment, NewLead, UpdateAppointmentRequest, UpdateLeadRequest,
    DEFAULT_APPOINTMENT_MINUTES, MIN_APPOINTMENT_MINUTES,
};

/// Combines a `YYYY-MM-DD` date and `HH:MM` time into one UTC timestamp.
pub fn combine_date_time(date: &str, time: &str) -> Result<DateTime<Utc>, ValidationError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: "appointment_date".to_string(),
            expected: "YYYY-MM-DD".to_string(),
        }
    })?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidFormat {
            field: "appointment_time".to_string(),
            expected: "HH:MM".to_string(),
        })?;
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

fn validate_status(status: &str) -> Result<(), ValidationError> {
    status
        .parse::<AppointmentStatus>()
        .map(|_| ())
        .map_err(|message| ValidationError::InvalidValue {
            field: "status".to_string(),
            message,
        })
}

fn validate_duration(duration: i32) -> Result<(), ValidationError> {
    if duration < MIN_APPOINTMENT_MINUTES {
        return Err(ValidationError::InvalidValue {
            field: "duration".to_string(),
            message: format!("must be at least {MIN_APPOINTMENT_MINUTES} minutes"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), ApiError> {
    let mut result = ValidationResult::new();
    for (value, field) in [
        (&req.first_name, "first_name"),
        (&req.last_name, "last_name"),
        (&req.phone, "phone"),
    ] {
        if let Err(e) = validate_required(value, field) {
            result.add_error(e);
        }
    }
    if !is_valid_email(&req.email) {
        result.add_error(ValidationError::InvalidEmail {
            field: "email".to_string(),
        });
    }
    result.into_result()?;

    let lead = state
        .store
        .create_lead(NewLead {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            source: req.source,
            status: req.status.unwrap_or_else(|| "new".to_string()),
            notes: req.notes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.store.list_leads(filter).await?))
}

pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, ApiError> {
    state
        .store
        .get_lead(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Lead"))
}

pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let mut lead = state
        .store
        .get_lead(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead"))?;

    if let Some(ref email) = req.email {
        if !is_valid_email(email) {
            return Err(vec![ValidationError::InvalidEmail {
                field: "email".to_string(),
            }]
            .into());
        }
    }

    if let Some(first_name) = req.first_name {
        lead.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        lead.last_name = last_name;
    }
    if let Some(email) = req.email {
        lead.email = email;
    }
    if let Some(phone) = req.phone {
        lead.phone = phone;
    }
    if let Some(source) = req.source {
        lead.source = Some(source);
    }
    if let Some(status) = req.status {
        lead.status = status;
    }
    if let Some(notes) = req.notes {
        lead.notes = Some(notes);
    }
    lead.updated_at = Utc::now();

    state
        .store
        .update_lead(id, lead)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Lead"))
}

pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_lead(id).await? {
        return Err(ApiError::not_found("Lead"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let mut result = ValidationResult::new();

    let title = req.title.unwrap_or_default();
    if let Err(e) = validate_required(&title, "title") {
        result.add_error(e);
    }
    let location = req.location.unwrap_or_default();
    if let Err(e) = validate_required(&location, "location") {
        result.add_error(e);
    }

    let status = req.status.unwrap_or_default();
    if status.is_empty() {
        result.add_error(ValidationError::Required("status".to_string()));
    } else if let Err(e) = validate_status(&status) {
        result.add_error(e);
    }

    let duration = req.duration.unwrap_or(DEFAULT_APPOINTMENT_MINUTES);
    if let Err(e) = validate_duration(duration) {
        result.add_error(e);
    }

    let appointment_date = match (req.appointment_date, req.appointment_time) {
        (Some(date), Some(time)) => match combine_date_time(&date, &time) {
            Ok(when) => Some(when),
            Err(e) => {
                result.add_error(e);
                None
            }
        },
        (date, time) => {
            if date.is_none() {
                result.add_error(ValidationError::Required("appointment_date".to_string()));
            }
            if time.is_none() {
                result.add_error(ValidationError::Required("appointment_time".to_string()));
            }
            None
        }
    };

    let lead_id = match req.lead_id {
        Some(lead_id) => {
            if state.store.get_lead(lead_id).await?.is_none() {
                result.add_error(ValidationError::InvalidValue {
                    field: "lead_id".to_string(),
                    message: "references no existing lead".to_string(),
                });
            }
            Some(lead_id)
        }
        None => {
            result.add_error(ValidationError::Required("lead_id".to_string()));
            None
        }
    };

    result.into_result()?;

    // An empty issue list leaves both values populated.
    let (Some(lead_id), Some(appointment_date)) = (lead_id, appointment_date) else {
        return Err(ApiError::Internal(
            "appointment fields missing after validation".to_string(),
        ));
    };

    let appointment = state
        .store
        .create_appointment(NewAppointment {
            lead_id,
            title,
            description: req.description,
            appointment_date,
            duration_minutes: duration,
            location,
            status,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.store.list_appointments(filter).await?))
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    state
        .store
        .get_appointment(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Appointment"))
}

pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let mut appointment = state
        .store
        .get_appointment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment"))?;

    let mut result = ValidationResult::new();

    if let Some(ref status) = req.status {
        if let Err(e) = validate_status(status) {
            result.add_error(e);
        }
    }
    if let Some(duration) = req.duration {
        if let Err(e) = validate_duration(duration) {
            result.add_error(e);
        }
    }
    if let Some(lead_id) = req.lead_id {
        if state.store.get_lead(lead_id).await?.is_none() {
            result.add_error(ValidationError::InvalidValue {
                field: "lead_id".to_string(),
                message: "references no existing lead".to_string(),
            });
        }
    }

    // The stored timestamp moves only when date and time arrive together.
    let when = match (&req.appointment_date, &req.appointment_time) {
        (Some(date), Some(time)) => match combine_date_time(date, time) {
            Ok(when) => Some(when),
            Err(e) => {
                result.add_error(e);
                None
            }
        },
        _ => None,
    };

    result.into_result()?;

    if let Some(lead_id) = req.lead_id {
        appointment.lead_id = lead_id;
    }
    if let Some(title) = req.title {
        appointment.title = title;
    }
    if let Some(description) = req.description {
        appointment.description = Some(description);
    }
    if let Some(when) = when {
        appointment.appointment_date = when;
    }
    if let Some(duration) = req.duration {
        appointment.duration_minutes = duration;
    }
    if let Some(location) = req.location {
        appointment.location = location;
    }
    if let Some(status) = req.status {
        appointment.status = status;
    }
    appointment.updated_at = Utc::now();

    state
        .store
        .update_appointment(id, appointment)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Appointment"))
}

pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_appointment(id).await? {
        return Err(ApiError::not_found("Appointment"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub async fn get_crm_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CrmStats>, ApiError> {
    let leads = state.store.list_leads(ListFilter::default()).await?;
    let appointments = state
        .store
        .list_appointments(ListFilter::default())
        .await?;
    let site_visits = state.store.list_site_visits().await?;

    let now = Utc::now();
    let upcoming = appointments
        .iter()
        .filter(|a| a.appointment_date > now)
        .count() as i64;
    let mut by_status: HashMap<String, i64> = HashMap::new();
    for appointment in &appointments {
        *by_status.entry(appointment.status.clone()).or_insert(0) += 1;
    }

    Ok(Json(CrmStats {
        total_leads: leads.len() as i64,
        total_appointments: appointments.len() as i64,
        total_site_visits: site_visits.len() as i64,
        upcoming_appointments: upcoming,
        appointments_by_status: by_status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_date_and_time_into_utc() {
        let when = combine_date_time("2025-01-10", "10:00").unwrap();
        assert_eq!(when.to_rfc3339(), "2025-01-10T10:00:00+00:00");
    }

    #[test]
    fn accepts_seconds_in_time() {
        let when = combine_date_time("2025-01-10", "10:00:30").unwrap();
        assert_eq!(when.to_rfc3339(), "2025-01-10T10:00:30+00:00");
    }

    #[test]
    fn rejects_malformed_date_or_time() {
        assert_eq!(
            combine_date_time("10/01/2025", "10:00").unwrap_err().field(),
            "appointment_date"
        );
        assert_eq!(
            combine_date_time("2025-01-10", "ten").unwrap_err().field(),
            "appointment_time"
        );
    }

    #[test]
    fn status_set_is_closed() {
        for s in [
            "scheduled",
            "confirmed",
            "in_progress",
            "completed",
            "cancelled",
            "no_show",
        ] {
            assert!(validate_status(s).is_ok(), "{s} should parse");
        }
        assert!(validate_status("done").is_err());
        assert!(validate_status("").is_err());
    }

    #[test]
    fn duration_floor_is_enforced() {
        assert!(validate_duration(MIN_APPOINTMENT_MINUTES).is_ok());
        assert!(validate_duration(MIN_APPOINTMENT_MINUTES - 1).is_err());
        assert!(validate_duration(DEFAULT_APPOINTMENT_MINUTES).is_ok());
    }
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::schema::activities;
use crate::shared::state::AppState;
use crate::shared::validation::ValidationError;

/// Window for the homepage "live feed" query.
pub const RECENT_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = activities)]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub activity_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub description: String,
    pub activity_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Visit,
    Inquiry,
    Sale,
    Meeting,
    Other,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Visit => "visit",
            Self::Inquiry => "inquiry",
            Self::Sale => "sale",
            Self::Meeting => "meeting",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visit" => Ok(Self::Visit),
            "inquiry" => Ok(Self::Inquiry),
            "sale" => Ok(Self::Sale),
            "meeting" => Ok(Self::Meeting),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown activity type: {s}")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    pub title: String,
    pub description: String,
    pub activity_type: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub activity_type: Option<String>,
}

fn checked_type(value: &str) -> Result<(), ApiError> {
    value
        .parse::<ActivityType>()
        .map(|_| ())
        .map_err(|message| {
            vec![ValidationError::InvalidValue {
                field: "activity_type".to_string(),
                message,
            }]
            .into()
        })
}

pub async fn list_activities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    Ok(Json(state.store.list_activities().await?))
}

pub async fn list_recent_activities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let since = Utc::now() - Duration::hours(RECENT_WINDOW_HOURS);
    Ok(Json(state.store.list_recent_activities(since).await?))
}

pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    checked_type(&req.activity_type)?;
    let activity = state
        .store
        .create_activity(NewActivity {
            title: req.title,
            description: req.description,
            activity_type: req.activity_type,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateActivityRequest>,
) -> Result<Json<Activity>, ApiError> {
    let mut activity = state
        .store
        .get_activity(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Activity"))?;

    if let Some(ref activity_type) = req.activity_type {
        checked_type(activity_type)?;
    }

    if let Some(title) = req.title {
        activity.title = title;
    }
    if let Some(description) = req.description {
        activity.description = description;
    }
    if let Some(activity_type) = req.activity_type {
        activity.activity_type = activity_type;
    }

    state
        .store
        .update_activity(id, activity)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Activity"))
}

pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_activity(id).await? {
        return Err(ApiError::not_found("Activity"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities))
        .route("/api/activities/recent", get(list_recent_activities))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/activities", post(create_activity))
        .route(
            "/api/admin/activities/:id",
            put(update_activity).delete(delete_activity),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_round_trips() {
        for t in [
            ActivityType::Visit,
            ActivityType::Inquiry,
            ActivityType::Sale,
            ActivityType::Meeting,
            ActivityType::Other,
        ] {
            assert_eq!(t.to_string().parse::<ActivityType>(), Ok(t));
        }
    }

    #[test]
    fn unknown_activity_type_is_rejected() {
        assert!("party".parse::<ActivityType>().is_err());
    }
}

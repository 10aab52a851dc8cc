use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::schema::{brochure_downloads, brochures};
use crate::shared::state::AppState;
use crate::shared::validation::{
    is_valid_email, validate_required, ValidationError, ValidationResult,
};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = brochures, treat_none_as_null = true)]
pub struct Brochure {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBrochure {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = brochure_downloads)]
pub struct BrochureDownload {
    pub id: Uuid,
    pub brochure_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBrochureDownload {
    pub brochure_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBrochureRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
}

// Lead-capture form; required fields surface in the issue list.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub download: BrochureDownload,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct BrochureStats {
    pub total_downloads: i64,
    pub brochures: Vec<BrochureDownloadCount>,
}

#[derive(Debug, Serialize)]
pub struct BrochureDownloadCount {
    pub brochure_id: Uuid,
    pub title: String,
    pub downloads: i64,
}

pub async fn list_brochures(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Brochure>>, ApiError> {
    Ok(Json(state.store.list_brochures().await?))
}

pub async fn download_brochure(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<DownloadResponse>), ApiError> {
    let brochure = state
        .store
        .get_brochure(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Brochure"))?;

    let mut result = ValidationResult::new();
    let user_name = req.user_name.unwrap_or_default();
    if let Err(e) = validate_required(&user_name, "user_name") {
        result.add_error(e);
    }
    let user_email = req.user_email.unwrap_or_default();
    if user_email.trim().is_empty() {
        result.add_error(ValidationError::Required("user_email".to_string()));
    } else if !is_valid_email(&user_email) {
        result.add_error(ValidationError::InvalidEmail {
            field: "user_email".to_string(),
        });
    }
    result.into_result()?;

    let download = state
        .store
        .create_brochure_download(NewBrochureDownload {
            brochure_id: brochure.id,
            user_name,
            user_email,
            user_phone: req.user_phone.filter(|p| !p.trim().is_empty()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DownloadResponse {
            download,
            download_url: brochure.file_url,
        }),
    ))
}

pub async fn create_brochure(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewBrochure>,
) -> Result<(StatusCode, Json<Brochure>), ApiError> {
    let brochure = state.store.create_brochure(req).await?;
    Ok((StatusCode::CREATED, Json(brochure)))
}

pub async fn update_brochure(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBrochureRequest>,
) -> Result<Json<Brochure>, ApiError> {
    let mut brochure = state
        .store
        .get_brochure(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Brochure"))?;

    if let Some(title) = req.title {
        brochure.title = title;
    }
    if let Some(description) = req.description {
        brochure.description = Some(description);
    }
    if let Some(file_url) = req.file_url {
        brochure.file_url = file_url;
    }

    state
        .store
        .update_brochure(id, brochure)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Brochure"))
}

pub async fn delete_brochure(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_brochure(id).await? {
        return Err(ApiError::not_found("Brochure"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn brochure_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BrochureStats>, ApiError> {
    let brochures = state.store.list_brochures().await?;
    let downloads = state.store.list_brochure_downloads().await?;

    let mut counts: HashMap<Uuid, i64> = HashMap::new();
    for download in &downloads {
        *counts.entry(download.brochure_id).or_insert(0) += 1;
    }

    let per_brochure = brochures
        .into_iter()
        .map(|b| BrochureDownloadCount {
            downloads: counts.get(&b.id).copied().unwrap_or(0),
            brochure_id: b.id,
            title: b.title,
        })
        .collect();

    Ok(Json(BrochureStats {
        total_downloads: downloads.len() as i64,
        brochures: per_brochure,
    }))
}

pub async fn list_brochure_downloads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BrochureDownload>>, ApiError> {
    Ok(Json(state.store.list_brochure_downloads().await?))
}

pub async fn delete_brochure_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_brochure_download(id).await? {
        return Err(ApiError::not_found("Brochure download"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/brochures", get(list_brochures))
        .route("/api/brochures/:id/download", post(download_brochure))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/brochures", post(create_brochure))
        .route(
            "/api/admin/brochures/:id",
            put(update_brochure).delete(delete_brochure),
        )
        .route("/api/admin/brochure-stats", get(brochure_stats))
        .route(
            "/api/admin/brochure-downloads",
            get(list_brochure_downloads),
        )
        .route(
            "/api/admin/brochure-downloads/:id",
            delete(delete_brochure_download),
        )
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::schema::videos;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = videos, treat_none_as_null = true)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
}

pub async fn list_videos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.store.list_videos().await?))
}

pub async fn create_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewVideo>,
) -> Result<(StatusCode, Json<Video>), ApiError> {
    let video = state.store.create_video(req).await?;
    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn update_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateVideoRequest>,
) -> Result<Json<Video>, ApiError> {
    let mut video = state
        .store
        .get_video(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video"))?;

    if let Some(title) = req.title {
        video.title = title;
    }
    if let Some(description) = req.description {
        video.description = Some(description);
    }
    if let Some(video_url) = req.video_url {
        video.video_url = video_url;
    }

    state
        .store
        .update_video(id, video)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Video"))
}

pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_video(id).await? {
        return Err(ApiError::not_found("Video"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/videos", get(list_videos))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/videos", post(create_video))
        .route(
            "/api/admin/videos/:id",
            put(update_video).delete(delete_video),
        )
}

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
use crate::shared::schema::testimonials;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = testimonials)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub investment: String,
    pub plot_size: String,
    pub returns: String,
    pub duration: String,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTestimonial {
    pub name: String,
    pub location: String,
    pub investment: String,
    pub plot_size: String,
    pub returns: String,
    pub duration: String,
    pub review: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTestimonialRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub investment: Option<String>,
    pub plot_size: Option<String>,
    pub returns: Option<String>,
    pub duration: Option<String>,
    pub review: Option<String>,
}

pub async fn list_testimonials(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.store.list_testimonials().await?))
}

pub async fn create_testimonial(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewTestimonial>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    let testimonial = state.store.create_testimonial(req).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

pub async fn update_testimonial(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTestimonialRequest>,
) -> Result<Json<Testimonial>, ApiError> {
    let mut testimonial = state
        .store
        .get_testimonial(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Testimonial"))?;

    if let Some(name) = req.name {
        testimonial.name = name;
    }
    if let Some(location) = req.location {
        testimonial.location = location;
    }
    if let Some(investment) = req.investment {
        testimonial.investment = investment;
    }
    if let Some(plot_size) = req.plot_size {
        testimonial.plot_size = plot_size;
    }
    if let Some(returns) = req.returns {
        testimonial.returns = returns;
    }
    if let Some(duration) = req.duration {
        testimonial.duration = duration;
    }
    if let Some(review) = req.review {
        testimonial.review = review;
    }

    state
        .store
        .update_testimonial(id, testimonial)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Testimonial"))
}

pub async fn delete_testimonial(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_testimonial(id).await? {
        return Err(ApiError::not_found("Testimonial"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/testimonials", get(list_testimonials))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/testimonials", post(create_testimonial))
        .route(
            "/api/admin/testimonials/:id",
            put(update_testimonial).delete(delete_testimonial),
        )
}

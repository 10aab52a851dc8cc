pub mod activities;
pub mod admin;
pub mod brochures;
pub mod config;
pub mod crm;
pub mod notifier;
pub mod shared;
pub mod store;
pub mod testimonials;
pub mod videos;
pub mod visits;

use axum::{middleware, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::shared::state::AppState;

/// Builds the full API surface. Public routes are open; staff routes sit
/// behind the bearer-token gate minted by `POST /api/admin/verify-password`.
pub fn api_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .merge(visits::routes())
        .merge(testimonials::routes())
        .merge(activities::routes())
        .merge(brochures::routes())
        .merge(videos::routes())
        .merge(admin::routes());

    let staff = Router::new()
        .merge(visits::admin_routes())
        .merge(crm::routes())
        .merge(testimonials::admin_routes())
        .merge(activities::admin_routes())
        .merge(brochures::admin_routes())
        .merge(videos::admin_routes())
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::require_staff,
        ));

    Router::new()
        .merge(public)
        .merge(staff)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

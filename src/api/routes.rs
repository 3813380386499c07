use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower::ServiceBuilder;
use axum::extract::DefaultBodyLimit;

use super::handlers::*;
use super::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/presets", get(list_presets))
        .route("/api/status", get(get_status))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/images", post(select_image))
        .route("/api/sessions/:id/recalculate", post(recalculate))
        .route("/api/sessions/:id/override", post(override_height))
        .route("/api/batch", post(upload_batch))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
                .layer(CorsLayer::permissive())
        )
}

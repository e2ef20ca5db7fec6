//! Multi-store storefront backend.
//!
//! Catalog, cart, order workflow, offers and reviews over a relational
//! store, fronted by an axum HTTP surface with JWT/OTP authentication.
//! Business rules live in [`services`]; [`handlers`] only translate between
//! HTTP and service calls.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod services;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use handlers::{build_state, AppState};

/// Full application router: health probe plus the versioned API, wrapped in
/// request tracing and response compression.
pub fn app_router(state: AppState) -> Router {
    let health = Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone());

    Router::new()
        .merge(health)
        .nest("/api/v1", handlers::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": { "status": "ok", "database": "up" } })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "message": "database unreachable", "error": "unavailable" })),
            )
        }
    }
}

//! HTTP surface: HTML wizard, JSON API and WebSocket feed on one axum router.

pub mod api;
pub mod error;
pub mod pages;
pub mod ws;

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::session::{PlaybookGenerator, SessionStore};

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub generator: Arc<PlaybookGenerator>,
}

/// Build the full router.
pub fn router(store: Arc<SessionStore>, generator: Arc<PlaybookGenerator>) -> Router {
    let state = AppState { store, generator };

    Router::new()
        .route("/health", get(health))
        .merge(pages::page_routes())
        .merge(api::api_routes())
        .merge(ws::ws_routes())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "gtm-playbook"
    }))
}

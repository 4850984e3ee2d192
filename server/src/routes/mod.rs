//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the websocket endpoint and the health probe under a
//! single Axum router. Everything interesting happens over the websocket;
//! `/healthz` exists for load balancers and deploy checks.

pub mod ws;

use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let cors = match state.config.client_origin.as_deref() {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new().allow_origin(value),
            Err(_) => {
                warn!(origin, "invalid CLIENT_ORIGIN; falling back to permissive CORS");
                CorsLayer::new().allow_origin(Any)
            }
        },
        None => CorsLayer::new().allow_origin(Any),
    };

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

//! HTTP router construction.
//!
//! Assembles the routes and middleware into a single `Router`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use docqa_core::config::ServerConfig;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
///
/// `max_upload_bytes` bounds the whole request body on `/upload`, multipart
/// framing included.
pub fn build_router(
    state: Arc<AppState>,
    server: &ServerConfig,
    max_upload_bytes: usize,
) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route(
            "/upload",
            post(api::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/ask", post(api::ask))
        .layer(cors_layer(&server.cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// `*` allows any origin; anything else must be a single exact origin.
fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    if origin.trim() == "*" {
        return Ok(CorsLayer::permissive());
    }
    let origin: HeaderValue = origin
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid CORS_ORIGIN '{}': {}", origin, e))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600)))
}

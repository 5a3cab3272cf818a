//! HTTP endpoints.
//!
//! Each sub-module owns one route. Shared error types live here.

mod ask;
mod health;
mod index;
mod upload;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every JSON handler's result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────
// Flat `api::foo` paths for route registration in router.rs.

pub use ask::ask;
pub use health::health;
pub use index::index;
pub use upload::upload;

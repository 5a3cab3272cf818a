//! Question answering endpoint.
//!
//! The client resends the document text with every question; nothing is
//! looked up server-side.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use docqa_llm::{FailureKind, LlmAnswer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::state::AppState;

use super::{api_error, ApiError};

const MISSING_FIELDS: &str = "Missing question or document context";

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// POST /ask
///
/// A missing API key is reported in-band as a 200 `answer`; upstream
/// failures map to 502.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        debug!("Rejected /ask body: {}", e);
        api_error(StatusCode::BAD_REQUEST, MISSING_FIELDS)
    })?;

    let (question, context) = match (req.question, req.context) {
        (Some(q), Some(c)) if !q.is_empty() && !c.is_empty() => (q, c),
        _ => return Err(api_error(StatusCode::BAD_REQUEST, MISSING_FIELDS)),
    };

    info!(
        "Question ({} chars) over {} chars of context",
        question.chars().count(),
        context.chars().count()
    );

    match state.answerer.answer(&question, &context).await {
        LlmAnswer::Answer(answer) => Ok(Json(AskResponse { answer })),
        missing @ LlmAnswer::Failure {
            kind: FailureKind::MissingCredential,
            ..
        } => Ok(Json(AskResponse {
            answer: missing.message().into_owned(),
        })),
        failure => Err(api_error(StatusCode::BAD_GATEWAY, failure.message())),
    }
}

//! Question answering over a single document's text.
//!
//! The whole (budgeted) document goes into one user prompt; there is no
//! retrieval step and no conversation memory.

use std::borrow::Cow;

use docqa_core::config::{LimitsConfig, LlmConfig};
use docqa_core::truncate_with_marker;
use tracing::{info, warn};

use crate::provider::{LlmError, LlmProvider, Message};

/// In-band text for a request made without a usable API key.
pub const MISSING_KEY_MESSAGE: &str =
    "Error: LLM API key is missing. Please add LLM_API_KEY to the .env file.";

/// Appended to the context when it exceeds the character budget.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Why an answer could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    /// Provider answered with a non-2xx status.
    Upstream { status: u16 },
    /// Connect error, timeout, or body read failure.
    Transport,
    MalformedResponse,
}

/// Outcome of one question. Never an `Err`: failures are a variant, so the
/// HTTP layer decides how each one is surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmAnswer {
    Answer(String),
    Failure { kind: FailureKind, detail: String },
}

impl LlmAnswer {
    /// Human-readable text for this outcome, suitable for showing to the user.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            LlmAnswer::Answer(text) => Cow::Borrowed(text),
            LlmAnswer::Failure { kind: FailureKind::MissingCredential, .. } => {
                Cow::Borrowed(MISSING_KEY_MESSAGE)
            }
            LlmAnswer::Failure { detail, .. } => {
                Cow::Owned(format!("Error communicating with LLM: {detail}"))
            }
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, LlmAnswer::Answer(_))
    }
}

impl From<LlmError> for LlmAnswer {
    fn from(err: LlmError) -> Self {
        let kind = match &err {
            LlmError::HttpError(_) => FailureKind::Transport,
            LlmError::ApiError { status, .. } => FailureKind::Upstream { status: *status },
            LlmError::ParseError(_) => FailureKind::MalformedResponse,
            LlmError::NotConfigured(_) => FailureKind::MissingCredential,
        };
        LlmAnswer::Failure {
            kind,
            detail: err.to_string(),
        }
    }
}

/// Cut the document text to the prompt budget.
pub fn prepare_context(context: &str, max_chars: usize) -> Cow<'_, str> {
    truncate_with_marker(context, max_chars, TRUNCATION_MARKER)
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}\n\nAnswer:")
}

/// Answers questions about client-supplied document text.
pub struct DocumentAnswerer {
    /// `None` when no usable API key is configured.
    provider: Option<Box<dyn LlmProvider>>,
    temperature: f32,
    context_max_chars: usize,
    system_prompt: Option<String>,
}

impl DocumentAnswerer {
    pub fn new(provider: Option<Box<dyn LlmProvider>>, temperature: f32, context_max_chars: usize) -> Self {
        Self {
            provider,
            temperature,
            context_max_chars,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt.filter(|s| !s.trim().is_empty());
        self
    }

    /// Build from config. A missing key is not an error here: the answerer
    /// is still created and reports the missing key on every question.
    pub fn from_config(llm_config: &LlmConfig, limits: &LimitsConfig) -> Result<Self, LlmError> {
        let provider = match crate::providers::create_provider(llm_config) {
            Ok(p) => {
                info!("LLM provider ready (model: {})", llm_config.model);
                Some(p)
            }
            Err(LlmError::NotConfigured(reason)) => {
                warn!("LLM provider not available: {}; /ask will report a missing key", reason);
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(provider, llm_config.temperature, limits.llm_context_max_chars)
            .with_system_prompt(llm_config.system_prompt.clone()))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn answer(&self, question: &str, context: &str) -> LlmAnswer {
        let Some(provider) = self.provider.as_ref() else {
            return LlmAnswer::Failure {
                kind: FailureKind::MissingCredential,
                detail: "no usable API key configured".to_string(),
            };
        };

        let context = prepare_context(context, self.context_max_chars);
        if matches!(context, Cow::Owned(_)) {
            info!("Context truncated to {} chars", self.context_max_chars);
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(build_prompt(question, &context)));

        match provider.complete(messages, self.temperature).await {
            Ok(text) => LlmAnswer::Answer(text),
            Err(e) => {
                warn!("LLM request failed: {}", e);
                e.into()
            }
        }
    }
}

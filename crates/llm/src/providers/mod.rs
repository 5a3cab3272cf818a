pub mod openai;

use std::time::Duration;

use docqa_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};

/// Create the chat-completion provider described by config.
///
/// Fails with `NotConfigured` when the API key is absent or a placeholder.
pub fn create_provider(llm_config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let api_key = llm_config
        .usable_api_key()
        .ok_or_else(|| LlmError::NotConfigured("LLM_API_KEY not set".into()))?;

    let timeout = (llm_config.timeout_secs > 0).then(|| Duration::from_secs(llm_config.timeout_secs));

    Ok(Box::new(openai::OpenAiProvider::new(
        api_key.to_string(),
        llm_config.model.clone(),
        llm_config.base_url.clone(),
        timeout,
    )?))
}

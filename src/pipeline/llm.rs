//! Completion call: send the IRAC prompt and return the generated summary.
//!
//! The handler depends only on the [`CompletionProvider`] trait, so tests can
//! swap in a deterministic fake. [`LlmCompletionClient`] is the production
//! implementation on top of an `edgequake_llm` provider.
//!
//! There is no retry loop: a single failed call fails the request, and the
//! caller sees the provider's message. Successful output is returned as is,
//! even when empty.

use crate::config::CompletionSettings;
use crate::error::CompletionError;
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Produces a summary for a fully built prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// [`CompletionProvider`] backed by an `edgequake_llm` chat provider.
pub struct LlmCompletionClient {
    provider: Arc<dyn LLMProvider>,
    settings: CompletionSettings,
}

impl LlmCompletionClient {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, settings: CompletionSettings) -> Self {
        Self { provider, settings }
    }

    /// Create the provider named in `settings`.
    ///
    /// The factory reads the provider's API key (e.g. `OPENAI_API_KEY`) from
    /// the environment.
    pub fn from_settings(settings: CompletionSettings) -> Result<Self, CompletionError> {
        let provider = ProviderFactory::create_llm_provider(&settings.provider, &settings.model)
            .map_err(|e| CompletionError::ProviderNotConfigured {
                provider: settings.provider.clone(),
                hint: format!("{e}"),
            })?;
        info!(
            "Completion provider ready: {} / {}",
            settings.provider, settings.model
        );
        Ok(Self::new(provider, settings))
    }
}

#[async_trait]
impl CompletionProvider for LlmCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let start = Instant::now();
        let messages = build_messages(prompt);
        let options = build_options(&self.settings);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| CompletionError::service(format!("{e}")))?;

        debug!(
            "Completion: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// System instruction followed by the user prompt.
fn build_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// Build `CompletionOptions` from the completion settings.
fn build_options(settings: &CompletionSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
        ..Default::default()
    }
}

//! Model implementations for Polyglot.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Offline testing and development
//! - **OpenAI**: OpenAI's GPT models (API key required)
//! - **Gemini**: Google's Gemini models (API key required)
//! - **Anthropic**: Anthropic's Claude models (API key required)

pub mod claude;
pub mod factory;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use polyglot_abstraction::{
    ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage,
};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, error};

pub use claude::ClaudeModel;
pub use factory::{ModelConfig, ModelFactory, ModelInfo, ProviderKind};
pub use gemini::GeminiModel;
pub use openai::OpenAIModel;

/// A mock implementation of the `Model` trait for testing and demonstration.
///
/// Scripted replies are returned in order; once the script is exhausted the
/// model echoes the last user message.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, ..Self::default() }
    }

    /// Creates a `MockModel` that answers the first request with `response`.
    #[must_use]
    pub fn with_response(id: String, response: impl Into<String>) -> Self {
        let model = Self::new(id);
        model.push_response(response);
        model
    }

    /// Queues a successful reply.
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(response.into()));
        }
    }

    /// Queues a failure.
    pub fn push_error(&self, err: ModelError) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
    }

    /// Every message list this model has been called with, oldest first.
    pub fn recorded_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "MockModel generating text"
        );

        self.generate_chat_completion(&[ChatMessage::user(prompt)], parameters).await
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "MockModel generating chat completion"
        );

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        let response_content = match scripted {
            Some(reply) => reply?,
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == "user")
                    .map_or("", |m| m.content.as_str());
                format!("Mock response for: {last_user}\nModel ID: {}", self.id)
            }
        };

        let prompt_tokens = messages.iter().map(|m| count_tokens(&m.content)).sum::<u32>();
        let completion_tokens = count_tokens(&response_content);

        Ok(ModelResponse {
            content: response_content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Maps a non-success HTTP status from a provider to a `ModelError`.
///
/// 402 and 429 are hard stops for the user (billing or rate limits), every
/// other status is reported with the body the provider sent back.
pub(crate) fn error_for_status(provider: &str, status: StatusCode, body: String) -> ModelError {
    error!(
        provider = provider,
        status = %status,
        error = %body,
        "Provider API returned error status"
    );

    if status == StatusCode::PAYMENT_REQUIRED || status == StatusCode::TOO_MANY_REQUESTS {
        return ModelError::QuotaExceeded { provider: provider.to_string(), message: Some(body) };
    }

    ModelError::ModelResponseError(format!("API error ({}): {}", status, body))
}

//! Claude (Anthropic) model implementation.
//!
//! This module provides an implementation of the `Model` trait for Anthropic's
//! Messages API.
//!
//! System messages are pulled out of the conversation and sent through the
//! dedicated `system` field. Multiple system messages are joined with a blank
//! line. The API requires `max_tokens`, so a default is filled in when the
//! caller does not set one.

use async_trait::async_trait;
use polyglot_abstraction::{
    ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error};

use crate::error_for_status;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Claude model implementation.
#[derive(Debug, Clone)]
pub struct ClaudeModel {
    /// The model ID (e.g., "claude-3-opus", "claude-3-haiku").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the Claude API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl ClaudeModel {
    /// Creates a new `ClaudeModel`, reading the key from `ANTHROPIC_API_KEY`.
    ///
    /// # Errors
    /// Returns `ModelError::MissingApiKey` if the variable is unset or empty.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey { provider: "anthropic".to_string() })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `ClaudeModel` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self { model_id, api_key, base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Points the model at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn extract_system_prompt(messages: &[ChatMessage]) -> Option<String> {
        let system_messages: Vec<&str> = messages
            .iter()
            .filter(|msg| msg.role == "system")
            .map(|msg| msg.content.as_str())
            .collect();

        if system_messages.is_empty() { None } else { Some(system_messages.join("\n\n")) }
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> ClaudeRequest {
        let params = parameters.unwrap_or_default();

        ClaudeRequest {
            model: self.model_id.clone(),
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: messages
                .iter()
                .filter(|msg| msg.role != "system")
                .map(|msg| ClaudeMessage { role: msg.role.clone(), content: msg.content.clone() })
                .collect(),
            system: Self::extract_system_prompt(messages),
            temperature: params.temperature,
            top_p: params.top_p,
            stop_sequences: params.stop_sequences,
        }
    }
}

#[async_trait]
impl Model for ClaudeModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "ClaudeModel generating text"
        );

        self.generate_chat_completion(&[ChatMessage::user(prompt)], parameters).await
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            parameters = ?parameters,
            "ClaudeModel generating chat completion"
        );

        let url = format!("{}/messages", self.base_url);
        let request_body = self.build_request(messages, parameters);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send request to Claude API");
                ModelError::RequestError(format!("Network error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(error_for_status("anthropic", status, error_text));
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Claude API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let content: String = claude_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if content.is_empty() {
            error!("No text content in Claude API response");
            return Err(ModelError::ModelResponseError("No content in API response".to_string()));
        }

        let usage = claude_response.usage.map(|u| ModelUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Claude API request/response structures

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContentBlock>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn model_for(server: &mockito::Server) -> ClaudeModel {
        ClaudeModel::with_api_key("claude-3-haiku".to_string(), "test-key".to_string())
            .with_base_url(server.url())
    }

    #[test]
    fn test_build_request_moves_system_prompt() {
        let model = ClaudeModel::with_api_key("claude-3-opus".to_string(), "k".to_string());
        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("question"),
            ChatMessage::system("more rules"),
        ];
        let request = model.build_request(&messages, None);

        assert_eq!(request.system.as_deref(), Some("rules\n\nmore rules"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_build_request_respects_max_tokens() {
        let model = ClaudeModel::with_api_key("claude-3-opus".to_string(), "k".to_string());
        let params = ModelParameters::with_temperature(0.2).max_tokens(512);
        let request = model.build_request(&[ChatMessage::user("q")], Some(params));

        assert_eq!(request.max_tokens, 512);
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.system.is_none());
    }

    #[tokio::test]
    async fn test_generate_chat_completion_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "claude-3-haiku",
                "system": "sys",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "content": [{"type": "text", "text": "Hi there"}],
                    "usage": {"input_tokens": 4, "output_tokens": 2}
                }"#,
            )
            .create_async()
            .await;

        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let response = model_for(&server).generate_chat_completion(&messages, None).await.unwrap();

        assert_eq!(response.content, "Hi there");
        assert_eq!(response.usage.unwrap().total_tokens, 6);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_text_billing_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(402)
            .with_body(r#"{"error": {"type": "billing_error"}}"#)
            .create_async()
            .await;

        let err = model_for(&server).generate_text("hi", None).await.unwrap_err();
        assert!(matches!(err, ModelError::QuotaExceeded { ref provider, .. } if provider == "anthropic"));
    }

    #[tokio::test]
    async fn test_generate_text_without_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": [{"type": "tool_use", "id": "x"}]}"#)
            .create_async()
            .await;

        let err = model_for(&server).generate_text("hi", None).await.unwrap_err();
        assert!(matches!(err, ModelError::ModelResponseError(_)));
    }
}

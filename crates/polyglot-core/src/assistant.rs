//! High-level assistant operations.
//!
//! [`CodeAssistant`] wraps a model with the prompts and reply parsing for each
//! action; [`Executor`] does the same for the Judge0 client. Both refuse a
//! second request for an action whose previous request is still pending.

use crate::chat::{ChatSession, ChatTurn};
use crate::code_blocks::{CodeBlockResponse, extract, extract_for_editor, route_to_editor};
use crate::error::{CoreError, Result};
use crate::execution::{Judge0Client, Judge0Language, Submission};
use crate::inflight::{Action, InFlight, InFlightToken};
use crate::prompts::{self, Prompt};
use crate::review::{Issue, parse_issues, review_lines};
use crate::settings::Settings;
use polyglot_abstraction::{Model, ModelError};
use polyglot_models::{ModelConfig, ModelFactory};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Solutions produced for a problem statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub blocks: CodeBlockResponse,
    /// The reply as the model sent it.
    pub raw: String,
}

/// Findings from a debug review plus the full sectioned reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugReport {
    pub issues: Vec<Issue>,
    pub text: String,
}

/// Model-backed assistant actions.
#[derive(Clone)]
pub struct CodeAssistant {
    model: Arc<dyn Model + Send + Sync>,
    inflight: InFlight,
}

impl CodeAssistant {
    pub fn new(model: Arc<dyn Model + Send + Sync>) -> Self {
        Self { model, inflight: InFlight::new() }
    }

    /// Builds the model selected in `settings`.
    ///
    /// Only the selected provider's own key is used.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider = settings.provider;
        let mut config = ModelConfig::new(provider, settings.model.clone());
        if provider.requires_api_key() {
            let key = settings
                .active_api_key()
                .ok_or_else(|| ModelError::MissingApiKey { provider: provider.to_string() })?;
            config = config.with_api_key(key);
        }
        info!(provider = %provider, model = %settings.model, "Creating code assistant");
        Ok(Self::new(ModelFactory::create(config)?))
    }

    /// Shares request tracking with other assistants or executors.
    #[must_use]
    pub fn with_inflight(mut self, inflight: InFlight) -> Self {
        self.inflight = inflight;
        self
    }

    pub fn inflight(&self) -> &InFlight {
        &self.inflight
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    fn begin(&self, action: Action) -> Result<InFlightToken> {
        self.inflight.try_begin(action).ok_or(CoreError::Busy(action))
    }

    async fn complete(&self, prompt: Prompt) -> Result<String> {
        let response =
            self.model.generate_chat_completion(&prompt.messages, Some(prompt.parameters)).await?;
        Ok(response.content)
    }

    /// Pseudocode and solutions in every supported language.
    pub async fn generate(&self, problem: &str) -> Result<Generation> {
        if problem.trim().is_empty() {
            return Err(CoreError::EmptyInput("a problem statement"));
        }
        let _token = self.begin(Action::Generate)?;

        let raw = self.complete(prompts::generation(problem)).await?;
        let blocks = extract(&raw);
        debug!(filled = ?blocks.filled_slots(), "Generation finished");
        Ok(Generation { blocks, raw })
    }

    /// One review finding per line.
    pub async fn analyze(&self, code: &str, language: &str) -> Result<Vec<String>> {
        if code.trim().is_empty() {
            return Err(CoreError::EmptyInput("some code"));
        }
        let _token = self.begin(Action::Analyze)?;

        let text = self.complete(prompts::analysis(code, language)).await?;
        Ok(review_lines(&text))
    }

    /// Sectioned review with classified findings.
    pub async fn debug(&self, code: &str, language: &str) -> Result<DebugReport> {
        if code.trim().is_empty() {
            return Err(CoreError::EmptyInput("some code"));
        }
        let _token = self.begin(Action::Debug)?;

        let text = self.complete(prompts::debug_review(code, language)).await?;
        Ok(DebugReport { issues: parse_issues(&text), text })
    }

    /// `code` rewritten from `from` into `to`.
    ///
    /// When the reply holds no block for `to`, the whole reply is returned.
    pub async fn convert(&self, code: &str, from: &str, to: &str) -> Result<String> {
        if code.trim().is_empty() {
            return Err(CoreError::EmptyInput("some code"));
        }
        let _token = self.begin(Action::Convert)?;

        let text = self.complete(prompts::conversion(code, from, to)).await?;
        let blocks = extract_for_editor(&text, to);
        Ok(route_to_editor(&blocks, to).map_or_else(|| text.trim().to_string(), str::to_string))
    }

    /// One chat exchange within `session`.
    pub async fn chat(&self, session: &mut ChatSession, query: &str) -> Result<ChatTurn> {
        if query.trim().is_empty() {
            return Err(CoreError::EmptyInput("a message"));
        }
        let _token = self.begin(Action::Chat)?;
        session.send(self.model.as_ref(), query).await
    }
}

/// Runs code on Judge0.
#[derive(Debug, Clone)]
pub struct Executor {
    client: Judge0Client,
    inflight: InFlight,
}

impl Executor {
    pub fn new(client: Judge0Client) -> Self {
        Self { client, inflight: InFlight::new() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Judge0Client::from_settings(settings))
    }

    #[must_use]
    pub fn with_inflight(mut self, inflight: InFlight) -> Self {
        self.inflight = inflight;
        self
    }

    /// Runs `code` with `stdin` as Judge0 language `language_id`.
    pub async fn run(&self, language_id: u32, code: &str, stdin: &str) -> Result<Submission> {
        if code.trim().is_empty() {
            return Err(CoreError::EmptyInput("some code"));
        }
        let _token = self.inflight.try_begin(Action::Run).ok_or(CoreError::Busy(Action::Run))?;
        Ok(self.client.submit(language_id, code, stdin).await?)
    }

    pub async fn languages(&self) -> Result<Vec<Judge0Language>> {
        Ok(self.client.languages().await?)
    }
}

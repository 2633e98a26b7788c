//! Provider catalog and model factory.
//!
//! This module maps provider names to concrete `Model` implementations and
//! carries the list of models each provider offers.

use crate::{ClaudeModel, GeminiModel, MockModel, OpenAIModel};
use polyglot_abstraction::{Model, ModelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Supported model providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat models.
    #[default]
    OpenAI,
    /// Google Gemini models.
    Gemini,
    /// Anthropic Claude models.
    #[serde(alias = "claude")]
    Anthropic,
    /// Offline mock model.
    Mock,
}

/// A model a provider offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Identifier sent to the provider.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
}

const OPENAI_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "gpt-4", name: "GPT-4" },
    ModelInfo { id: "gpt-4-turbo", name: "GPT-4 Turbo" },
    ModelInfo { id: "gpt-3.5-turbo", name: "GPT-3.5 Turbo" },
];

const ANTHROPIC_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "claude-3-opus", name: "Claude 3 Opus" },
    ModelInfo { id: "claude-3-sonnet", name: "Claude 3 Sonnet" },
    ModelInfo { id: "claude-3-haiku", name: "Claude 3 Haiku" },
];

const GEMINI_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "gemini-2.5-flash", name: "Gemini 2.5 Flash" },
    ModelInfo { id: "gemini-1.5-pro", name: "Gemini 1.5 Pro" },
    ModelInfo { id: "gemini-1.5-flash", name: "Gemini 1.5 Flash" },
    ModelInfo { id: "gemini-pro", name: "Gemini Pro" },
];

const MOCK_MODELS: &[ModelInfo] = &[ModelInfo { id: "mock", name: "Mock" }];

impl ProviderKind {
    /// Every provider, in display order.
    pub const ALL: [Self; 4] = [Self::OpenAI, Self::Gemini, Self::Anthropic, Self::Mock];

    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }

    /// Models offered by this provider. The first entry is the default.
    pub const fn catalog(self) -> &'static [ModelInfo] {
        match self {
            Self::OpenAI => OPENAI_MODELS,
            Self::Gemini => GEMINI_MODELS,
            Self::Anthropic => ANTHROPIC_MODELS,
            Self::Mock => MOCK_MODELS,
        }
    }

    /// The model selected when switching to this provider.
    pub const fn default_model(self) -> &'static str {
        self.catalog()[0].id
    }

    /// Environment variable holding this provider's key, if it needs one.
    pub const fn env_var(self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Mock => None,
        }
    }

    /// Whether requests to this provider need an API key.
    pub const fn requires_api_key(self) -> bool {
        self.env_var().is_some()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "mock" => Ok(Self::Mock),
            _ => {
                error!(provider = %s, "Unrecognized provider");
                Err(ModelError::UnsupportedModelProvider(format!("Unrecognized provider: {}", s)))
            }
        }
    }
}

/// Model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The provider to talk to.
    pub provider: ProviderKind,
    /// The model ID (e.g., "gemini-pro", "gpt-4").
    pub model_id: String,
    /// Optional API key (if not provided, will be loaded from environment).
    pub api_key: Option<String>,
    /// Optional API root override.
    pub base_url: Option<String>,
}

impl ModelConfig {
    /// Creates a new `ModelConfig` with the given provider and model ID.
    #[must_use]
    pub fn new(provider: ProviderKind, model_id: impl Into<String>) -> Self {
        Self { provider, model_id: model_id.into(), api_key: None, base_url: None }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the API root for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Factory for creating model instances.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model instance from the given configuration.
    ///
    /// An explicit empty key counts as missing. Without an explicit key the
    /// provider's environment variable is consulted.
    ///
    /// # Errors
    /// Returns `ModelError::MissingApiKey` when a real provider has no key.
    pub fn create(config: ModelConfig) -> Result<Arc<dyn Model + Send + Sync>, ModelError> {
        debug!(
            provider = %config.provider,
            model_id = %config.model_id,
            "Creating model instance"
        );

        let api_key = match config.api_key {
            Some(key) if key.trim().is_empty() => {
                return Err(ModelError::MissingApiKey {
                    provider: config.provider.as_str().to_string(),
                });
            }
            other => other,
        };

        match config.provider {
            ProviderKind::Mock => Ok(Arc::new(MockModel::new(config.model_id))),
            ProviderKind::OpenAI => {
                let mut model = match api_key {
                    Some(key) => OpenAIModel::with_api_key(config.model_id, key),
                    None => OpenAIModel::new(config.model_id)?,
                };
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Ok(Arc::new(model))
            }
            ProviderKind::Gemini => {
                let mut model = match api_key {
                    Some(key) => GeminiModel::with_api_key(config.model_id, key),
                    None => GeminiModel::new(config.model_id)?,
                };
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Ok(Arc::new(model))
            }
            ProviderKind::Anthropic => {
                let mut model = match api_key {
                    Some(key) => ClaudeModel::with_api_key(config.model_id, key),
                    None => ClaudeModel::new(config.model_id)?,
                };
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                Ok(Arc::new(model))
            }
        }
    }

    /// Creates a model instance from a provider name and model ID.
    ///
    /// # Errors
    /// Returns a `ModelError` if the provider is unrecognized or creation fails.
    pub fn create_from_str(
        provider: &str,
        model_id: impl Into<String>,
    ) -> Result<Arc<dyn Model + Send + Sync>, ModelError> {
        let provider = ProviderKind::from_str(provider)?;
        Self::create(ModelConfig::new(provider, model_id))
    }
}

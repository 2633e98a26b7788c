//! Command type definitions shared between main.rs and tests.

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Show the current settings (keys are masked)
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the settings file path
    Path,

    /// List the models a provider offers
    Models {
        /// Provider to list (defaults to the selected one)
        provider: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Select a provider (resets the model to its default)
    SetProvider {
        /// openai, gemini, anthropic or mock
        provider: String,
    },

    /// Select a model from the current provider's catalog
    SetModel {
        /// Model ID, e.g. gpt-4-turbo
        model: String,
    },

    /// Store an API key (prompts when --key is omitted; an empty key clears it)
    SetKey {
        /// Provider the key belongs to (defaults to the selected one)
        provider: Option<String>,

        /// The key itself
        #[arg(long)]
        key: Option<String>,
    },

    /// Configure the Judge0 execution service
    SetJudge0 {
        /// Base URL of the Judge0 API
        #[arg(long)]
        url: Option<String>,

        /// Value for the X-RapidAPI-Host header (empty to omit the header)
        #[arg(long)]
        host: Option<String>,

        /// RapidAPI key (empty to clear)
        #[arg(long)]
        key: Option<String>,
    },
}

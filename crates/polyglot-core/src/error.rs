//! Error types for Polyglot Core.

use crate::execution::ExecutionError;
use crate::inflight::Action;
use crate::settings::SettingsError;
use polyglot_abstraction::ModelError;
use thiserror::Error;

/// Core error type for assistant operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The model provider failed or is not configured.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// The execution service failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Settings could not be loaded or saved.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// A required input was empty.
    #[error("Please enter {0}")]
    EmptyInput(&'static str),

    /// A request for the same action is still pending.
    #[error("A {0} request is already in progress")]
    Busy(Action),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

//! Polyglot Core - code generation, review and execution backend.
//!
//! This crate provides the core functionality for Polyglot, including:
//! - Extraction of fenced code blocks from model replies
//! - Prompts and reply parsing for every assistant action
//! - Chat sessions bound to an editor buffer
//! - Code execution through Judge0
//! - Persistent user settings
//!
//! # Example
//!
//! ```rust,no_run
//! use polyglot_core::{CodeAssistant, SettingsHandle, SettingsStore};
//!
//! #[tokio::main]
//! async fn main() -> polyglot_core::Result<()> {
//!     let settings = SettingsHandle::open(SettingsStore::open_default())?;
//!     let assistant = CodeAssistant::from_settings(&settings.current())?;
//!     let generation = assistant.generate("Reverse a string").await?;
//!     println!("{}", generation.blocks.python);
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod chat;
pub mod code_blocks;
pub mod error;
pub mod execution;
pub mod inflight;
pub mod prompts;
pub mod review;
pub mod settings;

pub use assistant::{CodeAssistant, DebugReport, Executor, Generation};
pub use chat::{ChatSession, ChatTurn, EditorState};
pub use code_blocks::{CodeBlockResponse, CodeSlot, extract, extract_for_editor, route_to_editor};
pub use error::{CoreError, Result};
pub use execution::{
    ExecutionError, ExecutionLanguage, ExecutionOutcome, Judge0Client, Judge0Language, Submission,
    resolve_language_id,
};
pub use inflight::{Action, InFlight, InFlightToken};
pub use review::{Issue, IssueKind, Severity};
pub use settings::{Settings, SettingsError, SettingsHandle, SettingsStore};

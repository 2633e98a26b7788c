//! Command implementations for the Polyglot CLI.

pub mod chat;
pub mod convert;
pub mod extract;
pub mod generate;
pub mod review;
pub mod run;
pub mod settings;
pub mod types;

pub use types::SettingsCommand;

use anyhow::{Context, Result};
use colored::Colorize;
use polyglot_core::{CodeBlockResponse, CodeSlot, Settings};
use polyglot_models::ProviderKind;
use std::io::Read;
use std::path::Path;

/// Provider and model chosen on the command line for this run only.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl Overrides {
    /// Applies the overrides to a copy of `settings`; nothing is saved.
    pub fn apply(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(provider) = &self.provider {
            let provider: ProviderKind = provider.parse()?;
            settings.set_provider(provider);
        }
        if let Some(model) = &self.model {
            settings.set_model(model)?;
        }
        Ok(settings)
    }
}

/// Reads a source file, or stdin when `path` is `-`.
pub fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content).context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Prints every filled slot under a heading.
pub fn print_blocks(blocks: &CodeBlockResponse) {
    if blocks.is_empty() {
        println!("{}", "No code blocks found".yellow());
        return;
    }

    let mut slots = blocks.filled_slots();
    if !blocks.editor.is_empty() {
        slots.push(CodeSlot::Editor);
    }
    for slot in slots {
        println!("{}", format!("── {} ──", slot_title(slot)).bold().cyan());
        println!("{}", blocks.get(slot));
        println!();
    }
}

pub fn slot_title(slot: CodeSlot) -> &'static str {
    match slot {
        CodeSlot::PseudoCode => "Pseudocode",
        CodeSlot::Python => "Python",
        CodeSlot::Java => "Java",
        CodeSlot::Cpp => "C++",
        CodeSlot::JavaScript => "JavaScript",
        CodeSlot::Editor => "Editor",
    }
}

//! Extract command implementation.
//!
//! Runs the code block extractor over a saved model reply. Works offline.

use super::{print_blocks, read_source};
use anyhow::Result;
use colored::Colorize;
use polyglot_core::code_blocks::{extract_for_editor, route_to_editor};
use std::path::PathBuf;

/// Execute the extract command.
pub fn execute(file: Option<PathBuf>, editor_language: Option<String>, json_output: bool) -> Result<()> {
    let text = read_source(&file.unwrap_or_else(|| PathBuf::from("-")))?;
    let editor_language = editor_language.unwrap_or_default();
    let blocks = extract_for_editor(&text, &editor_language);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    print_blocks(&blocks);
    if !editor_language.is_empty() && route_to_editor(&blocks, &editor_language).is_some() {
        eprintln!("{}", format!("Editor ({}) would be updated", editor_language).dimmed());
    }
    Ok(())
}

//! Run and languages command implementations.

use super::read_source;
use anyhow::{Context, Result};
use colored::Colorize;
use polyglot_core::{ExecutionLanguage, ExecutionOutcome, Executor, Settings, resolve_language_id};
use std::path::{Path, PathBuf};

/// Execute the run command.
pub async fn execute(
    settings: &Settings,
    file: &Path,
    language: &str,
    stdin: Option<String>,
    stdin_file: Option<PathBuf>,
) -> Result<()> {
    let language_id = resolve_language_id(language)?;
    let code = read_source(file)?;
    let stdin = match (stdin, stdin_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => String::new(),
    };

    let executor = Executor::from_settings(settings);
    let submission = executor.run(language_id, &code, &stdin).await?;

    let text = submission.outcome.display_text();
    match submission.outcome {
        ExecutionOutcome::Success { .. } => println!("{}", text),
        ExecutionOutcome::RuntimeError { .. } | ExecutionOutcome::CompileError { .. } => {
            println!("{}", text.red());
        }
    }

    let mut details = Vec::new();
    if let Some(status) = &submission.status {
        details.push(status.clone());
    }
    if let Some(time) = &submission.time {
        details.push(format!("{}s", time));
    }
    if let Some(memory) = submission.memory {
        details.push(format!("{} KB", memory));
    }
    if !details.is_empty() {
        eprintln!("{}", details.join(" · ").dimmed());
    }
    Ok(())
}

/// List the languages the execution service supports.
pub async fn languages(settings: &Settings) -> Result<()> {
    let executor = Executor::from_settings(settings);
    let languages = executor.languages().await?;

    println!("{:<6} {}", "ID", "Name");
    println!("{}", "─".repeat(40));
    for language in languages {
        let id = language.id.to_string();
        let id = if ExecutionLanguage::from_id(language.id).is_some() { id.green() } else { id.normal() };
        println!("{:<6} {}", id, language.name);
    }
    Ok(())
}

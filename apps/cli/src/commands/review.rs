//! Analyze and debug command implementations.

use super::read_source;
use anyhow::{Context, Result};
use colored::Colorize;
use polyglot_core::{CodeAssistant, IssueKind, Settings};
use std::path::Path;

/// Execute the analyze command: one finding per line.
pub async fn analyze(settings: &Settings, file: &Path, language: &str) -> Result<()> {
    let code = read_source(file)?;
    let assistant = CodeAssistant::from_settings(settings).context("Failed to create model")?;
    let lines = assistant.analyze(&code, language).await?;

    if lines.is_empty() {
        println!("{}", "No issues reported".green());
    }
    for line in lines {
        println!("• {}", line);
    }
    Ok(())
}

/// Execute the debug command: a table of classified findings.
pub async fn debug(settings: &Settings, file: &Path, language: &str, json_output: bool) -> Result<()> {
    let code = read_source(file)?;
    let assistant = CodeAssistant::from_settings(settings).context("Failed to create model")?;
    let report = assistant.debug(&code, language).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Issues ({})", report.issues.len()).bold().green());
    println!();
    println!("{:<12} {:<6} {:<10} {}", "Type", "Line", "Severity", "Message");
    println!("{}", "─".repeat(80));

    for issue in &report.issues {
        let kind = match issue.kind {
            IssueKind::Error => issue.kind.as_str().red(),
            IssueKind::Warning => issue.kind.as_str().yellow(),
            IssueKind::Suggestion => issue.kind.as_str().cyan(),
        };
        let line = issue.line.map_or_else(|| "-".to_string(), |n| n.to_string());
        println!("{:<12} {:<6} {:<10} {}", kind, line, issue.severity.to_string(), issue.message);
    }
    println!();
    Ok(())
}

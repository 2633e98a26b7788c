//! Convert command implementation.

use super::read_source;
use anyhow::{Context, Result};
use polyglot_core::{CodeAssistant, Settings};
use std::path::Path;

/// Execute the convert command.
pub async fn execute(settings: &Settings, file: &Path, from: &str, to: &str) -> Result<()> {
    let code = read_source(file)?;
    let assistant = CodeAssistant::from_settings(settings).context("Failed to create model")?;
    let converted = assistant.convert(&code, from, to).await?;
    println!("{}", converted);
    Ok(())
}

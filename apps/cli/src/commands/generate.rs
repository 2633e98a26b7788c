//! Generate command implementation.

use super::print_blocks;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use polyglot_core::{CodeAssistant, CodeSlot, Settings};

/// Execute the generate command.
pub async fn execute(
    settings: &Settings,
    problem: String,
    json_output: bool,
    slot: Option<String>,
) -> Result<()> {
    let slot = slot.map(|s| s.parse::<CodeSlot>().map_err(anyhow::Error::msg)).transpose()?;
    let assistant = CodeAssistant::from_settings(settings).context("Failed to create model")?;

    if !json_output && slot.is_none() {
        eprintln!("{}", format!("Generating with {}...", assistant.model_id()).dimmed());
    }
    let generation = assistant.generate(&problem).await?;

    if let Some(slot) = slot {
        let code = generation.blocks.get(slot);
        if code.is_empty() {
            bail!("The reply contains no {} block", slot);
        }
        println!("{}", code);
        return Ok(());
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&generation.blocks)?);
    } else {
        print_blocks(&generation.blocks);
    }
    Ok(())
}

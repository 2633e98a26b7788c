//! Chat command implementation.
//!
//! An interactive loop about one source file. Each line read from stdin is
//! sent as a message; `/clear` forgets the conversation and `/exit` leaves.

use super::{print_blocks, read_source, slot_title};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use polyglot_core::{ChatSession, CodeAssistant, CoreError, EditorState, Settings};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Execute the chat command.
pub async fn execute(settings: &Settings, file: &Path, language: &str, write: bool) -> Result<()> {
    if write && file.as_os_str() == "-" {
        bail!("--write needs a file, not stdin");
    }
    let code = read_source(file)?;
    let assistant = CodeAssistant::from_settings(settings).context("Failed to create model")?;
    let mut session = ChatSession::new(EditorState::new(code, language));

    println!("{}", format!("Chatting about {} with {}", file.display(), assistant.model_id()).bold().cyan());
    println!("{}", "Type /exit to quit, /clear to reset the conversation.".dimmed());

    let stdin = io::stdin();
    loop {
        print!("{} ", "you>".green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear_history();
                println!("{}", "Conversation cleared".dimmed());
                continue;
            }
            _ => {}
        }

        let turn = match assistant.chat(&mut session, line).await {
            Ok(turn) => turn,
            Err(err @ (CoreError::Model(_) | CoreError::Busy(_))) => {
                eprintln!("{} {}", "Error:".red().bold(), err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        println!("{}", "assistant>".cyan().bold());
        println!("{}", turn.reply);
        println!();

        if !turn.updated_slots.is_empty() {
            let names: Vec<&str> = turn.updated_slots.iter().map(|slot| slot_title(*slot)).collect();
            println!("{}", format!("Updated solutions: {}", names.join(", ")).dimmed());
        }

        if let Some(updated) = &turn.editor_update {
            if write {
                std::fs::write(file, format!("{}\n", updated))
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                println!("{}", format!("Wrote {}", file.display()).green());
            } else {
                println!("{}", "Editor code updated (use --write to save it)".dimmed());
            }
        }
    }

    if !session.generated().is_empty() {
        println!();
        print_blocks(session.generated());
    }
    Ok(())
}

//! Polyglot CLI - Command-line interface for the Polyglot code assistant
//!
//! This CLI provides a `polyglot` command that generates solutions in several
//! languages, reviews and converts code, chats about a source file and runs
//! code on a Judge0 server.

mod commands;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use polyglot_core::{SettingsHandle, SettingsStore};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{Overrides, SettingsCommand, chat, convert, extract, generate, review, run, settings};

/// Polyglot CLI - multi-language code assistant
///
/// Generates pseudocode plus Python, Java, C++ and JavaScript solutions for a
/// problem statement and helps review, convert and run code.
#[derive(Parser, Debug)]
#[command(
    name = "polyglot",
    author,
    version,
    about = "Polyglot - multi-language code assistant",
    long_about = "Polyglot generates solutions in several languages from a problem statement.\nIt can also review, debug, convert and run code, and chat about a source file."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Provider for this run (openai, gemini, anthropic, mock)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model for this run
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract code blocks from a model reply
    ///
    /// Reads the reply from FILE (or stdin) and splits it into pseudocode,
    /// Python, Java, C++ and JavaScript blocks. Works offline.
    Extract {
        /// Reply file ("-" or omitted for stdin)
        file: Option<PathBuf>,

        /// Keep a block tagged with this language in the editor slot
        #[arg(long)]
        editor_language: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate pseudocode and solutions for a problem statement
    Generate {
        /// The problem statement
        problem: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Print only this block (pseudocode, python, java, cpp, javascript)
        #[arg(long)]
        slot: Option<String>,
    },

    /// Run a source file on Judge0
    Run {
        /// Source file ("-" for stdin)
        file: PathBuf,

        /// c, cpp, java, python, javascript or a Judge0 id from `polyglot languages`
        #[arg(short = 'L', long)]
        language: String,

        /// Program input
        #[arg(long, conflicts_with = "stdin_file")]
        stdin: Option<String>,

        /// File holding the program input
        #[arg(long)]
        stdin_file: Option<PathBuf>,
    },

    /// List the languages the Judge0 server supports
    Languages,

    /// Review code, one finding per line
    Analyze {
        /// Source file ("-" for stdin)
        file: PathBuf,

        /// Language of the code
        #[arg(short = 'L', long)]
        language: String,
    },

    /// Detailed review with classified issues and complexity
    Debug {
        /// Source file ("-" for stdin)
        file: PathBuf,

        /// Language of the code
        #[arg(short = 'L', long)]
        language: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert code from one language to another
    Convert {
        /// Source file ("-" for stdin)
        file: PathBuf,

        /// Language of the code
        #[arg(long)]
        from: String,

        /// Target language
        #[arg(long)]
        to: String,
    },

    /// Chat about a source file
    ///
    /// Messages are read line by line from stdin. Code the assistant returns
    /// for the file's language replaces the buffer.
    Chat {
        /// Source file
        file: PathBuf,

        /// Language of the file
        #[arg(short = 'L', long)]
        language: String,

        /// Save code updates back to the file
        #[arg(long)]
        write: bool,
    },

    /// Manage provider, model, API keys and Judge0 settings
    #[command(subcommand)]
    Settings(SettingsCommand),
}

fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let handle = SettingsHandle::open(SettingsStore::open_default()).context("Failed to load settings")?;
    let stored = handle.current();

    // Initialize tracing
    let level = parse_level(args.log_level.as_deref().or(stored.log_level.as_deref()).unwrap_or("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // If no command provided, show help
    let command = if let Some(cmd) = args.command {
        cmd
    } else {
        Args::command().print_help()?;
        return Ok(());
    };

    let overrides = Overrides { provider: args.provider, model: args.model };

    match command {
        Command::Extract { file, editor_language, json } => {
            extract::execute(file, editor_language, json)?;
        }
        Command::Generate { problem, json, slot } => {
            generate::execute(&overrides.apply(stored)?, problem, json, slot).await?;
        }
        Command::Run { file, language, stdin, stdin_file } => {
            run::execute(&stored, &file, &language, stdin, stdin_file).await?;
        }
        Command::Languages => {
            run::languages(&stored).await?;
        }
        Command::Analyze { file, language } => {
            review::analyze(&overrides.apply(stored)?, &file, &language).await?;
        }
        Command::Debug { file, language, json } => {
            review::debug(&overrides.apply(stored)?, &file, &language, json).await?;
        }
        Command::Convert { file, from, to } => {
            convert::execute(&overrides.apply(stored)?, &file, &from, &to).await?;
        }
        Command::Chat { file, language, write } => {
            chat::execute(&overrides.apply(stored)?, &file, &language, write).await?;
        }
        Command::Settings(cmd) => {
            settings::execute(&handle, cmd)?;
        }
    }

    Ok(())
}

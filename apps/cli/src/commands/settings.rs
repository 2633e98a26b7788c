//! Settings command implementation.

use super::SettingsCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use polyglot_core::SettingsHandle;
use polyglot_core::settings::DEFAULT_JUDGE0_URL;
use polyglot_models::ProviderKind;
use rpassword::read_password;
use serde_json::json;
use std::io::{self, Write};

/// Execute the settings command.
pub fn execute(handle: &SettingsHandle, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show { json } => show(handle, json),
        SettingsCommand::Path => {
            println!("{}", handle.store().path().display());
            Ok(())
        }
        SettingsCommand::Models { provider, json } => models(handle, provider.as_deref(), json),
        SettingsCommand::SetProvider { provider } => {
            let provider: ProviderKind = provider.parse()?;
            let settings = handle.update(|s| {
                s.set_provider(provider);
                Ok(())
            })?;
            println!("Provider set to {} (model {})", provider.as_str().green(), settings.model.cyan());
            Ok(())
        }
        SettingsCommand::SetModel { model } => {
            let settings = handle.update(|s| s.set_model(&model))?;
            println!("Model set to {}", settings.model.green());
            Ok(())
        }
        SettingsCommand::SetKey { provider, key } => set_key(handle, provider.as_deref(), key),
        SettingsCommand::SetJudge0 { url, host, key } => {
            let settings = handle.update(|s| {
                if let Some(url) = url {
                    let url = url.trim().trim_end_matches('/');
                    s.judge0.base_url =
                        if url.is_empty() { DEFAULT_JUDGE0_URL.to_string() } else { url.to_string() };
                }
                if let Some(host) = host {
                    s.judge0.host = non_empty(&host);
                }
                if let Some(key) = key {
                    s.judge0.api_key = non_empty(&key);
                }
                Ok(())
            })?;
            println!("Judge0 endpoint: {}", settings.judge0.base_url.green());
            Ok(())
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Shows the first and last four characters of a key.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn show(handle: &SettingsHandle, json_output: bool) -> Result<()> {
    let settings = handle.current();

    let keys: Vec<_> = ProviderKind::ALL
        .into_iter()
        .filter(|p| p.requires_api_key())
        .map(|provider| {
            let source = match (settings.api_key_for(provider), settings.api_keys.get(provider)) {
                (None, _) => "unset",
                (Some(active), Some(stored)) if active == stored => "file",
                (Some(_), _) => "env",
            };
            (provider, settings.api_key_for(provider).map(mask), source)
        })
        .collect();

    if json_output {
        let api_keys: serde_json::Map<_, _> = keys
            .iter()
            .map(|(provider, masked, source)| {
                (provider.as_str().to_string(), json!({ "key": masked, "source": source }))
            })
            .collect();
        let value = json!({
            "path": handle.store().path().display().to_string(),
            "provider": settings.provider,
            "model": settings.model,
            "log_level": settings.log_level,
            "api_keys": api_keys,
            "judge0": {
                "base_url": settings.judge0.base_url,
                "host": settings.judge0.host,
                "api_key": settings.judge0_api_key().map(mask),
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!("{}", "Polyglot Settings".bold().green());
    println!();
    println!("  File:      {}", handle.store().path().display().to_string().dimmed());
    println!("  Provider:  {}", settings.provider.as_str().cyan());
    println!("  Model:     {}", settings.model.cyan());
    if let Some(level) = &settings.log_level {
        println!("  Log level: {}", level);
    }
    println!();
    println!("{}", "API keys".bold());
    for (provider, masked, source) in &keys {
        let marker = if *provider == settings.provider { "*" } else { " " };
        match masked {
            Some(masked) => println!("  {} {:<10} {} ({})", marker, provider.as_str(), masked, source),
            None => println!("  {} {:<10} {}", marker, provider.as_str(), "Not configured".yellow()),
        }
    }
    println!();
    println!("{}", "Judge0".bold());
    println!("  URL:  {}", settings.judge0.base_url);
    println!("  Host: {}", settings.judge0.host.as_deref().unwrap_or("-"));
    println!(
        "  Key:  {}",
        settings.judge0_api_key().map_or_else(|| "Not configured".yellow().to_string(), mask)
    );
    println!();
    Ok(())
}

fn models(handle: &SettingsHandle, provider: Option<&str>, json_output: bool) -> Result<()> {
    let settings = handle.current();
    let provider = match provider {
        Some(name) => name.parse::<ProviderKind>()?,
        None => settings.provider,
    };
    let catalog = provider.catalog();

    if json_output {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }

    println!("{}", format!("Models for {}", provider).bold().green());
    for info in catalog {
        let selected = provider == settings.provider && info.id == settings.model;
        let marker = if selected { "*".green() } else { " ".normal() };
        println!("  {} {:<20} {}", marker, info.id, info.name.dimmed());
    }
    Ok(())
}

fn set_key(handle: &SettingsHandle, provider: Option<&str>, key: Option<String>) -> Result<()> {
    let provider = match provider {
        Some(name) => name.parse::<ProviderKind>()?,
        None => handle.current().provider,
    };

    let key = match key {
        Some(key) => key,
        None => {
            print!("Enter API key for {}: ", provider);
            io::stdout().flush()?;
            read_password().context("Failed to read API key")?
        }
    };

    handle.update(|s| s.set_api_key(provider, &key))?;
    if key.trim().is_empty() {
        println!("API key for {} cleared", provider.as_str().yellow());
    } else {
        println!("API key for {} saved", provider.as_str().green());
    }
    Ok(())
}

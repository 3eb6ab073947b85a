use std::io::{self, BufRead, Write};

use serde::Serialize;

use crate::config::Config;
use crate::error::{GhiError, Result};

#[derive(Serialize)]
struct InitConfig<'a> {
    token: &'a str,
    owner: &'a str,
    name: &'a str,
}

fn prompt(input: &mut impl BufRead, message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn render(token: &str, owner: &str, name: &str) -> Result<String> {
    toml::to_string(&InitConfig { token, owner, name })
        .map_err(|e| GhiError::InvalidInput(e.to_string()))
}

/// Split `owner/name`, or return `None` when the text has no slash.
fn split_repository(text: &str) -> Option<(&str, &str)> {
    let (owner, name) = text.split_once('/')?;
    let (owner, name) = (owner.trim(), name.trim());
    (!owner.is_empty() && !name.is_empty()).then_some((owner, name))
}

pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    if config_path.exists() {
        let answer = prompt(
            &mut input,
            &format!(
                "Config file already exists at {}. Overwrite? [y/N] ",
                config_path.display()
            ),
        )?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("ghi configuration");
    println!("=================\n");

    let token = prompt(
        &mut input,
        "Enter a GitHub token (create one at https://github.com/settings/tokens): ",
    )?;
    if token.is_empty() {
        return Err(GhiError::MissingToken);
    }

    let repository = prompt(&mut input, "Repository to browse (owner/name): ")?;
    let (owner, name) = split_repository(&repository).ok_or_else(|| {
        GhiError::InvalidInput(format!("expected owner/name, got '{repository}'"))
    })?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GhiError::ConfigRead {
            path: config_path.clone(),
            source: e,
        })?;
    }

    std::fs::write(&config_path, render(&token, owner, name)?).map_err(|e| {
        GhiError::ConfigRead {
            path: config_path.clone(),
            source: e,
        }
    })?;

    println!("\nConfig saved to {}", config_path.display());
    println!("You can now run 'ghi issues'.");

    Ok(())
}

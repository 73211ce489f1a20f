//! Initialize a new shardkit project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    println!("{} Initializing shardkit project...", "→".blue());

    std::fs::create_dir_all(&base_path)
        .with_context(|| format!("Failed to create {}", base_path.display()))?;

    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        Config::starter().save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    println!();
    println!("{} shardkit project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} shardkit mapping list", "1.".blue());
    println!("  {} shardkit route M_store_id 42", "2.".blue());
    println!("  {} shardkit distribution M_store_id", "3.".blue());

    Ok(())
}

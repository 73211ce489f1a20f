//! Configuration management for the shardkit CLI.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use shardkit::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "shardkit.toml";

/// Project configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sharding: ShardingConfig,
}

impl Config {
    /// Starter configuration written by `shardkit init`.
    pub fn starter() -> Self {
        let mapping = MappingConfig::new("M_store_id", HashStrategy::Ring)
            .with_node(NodeConfig::new("node1"))
            .with_node(NodeConfig::new("node2"));
        Self {
            sharding: ShardingConfig::default().with_mapping(mapping),
        }
    }

    /// Load and validate config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .sharding
            .validate()
            .with_context(|| format!("Invalid sharding config: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Build a shard manager without live connections.
    ///
    /// Routing and topology inspection never open a connection, so an
    /// empty registry is enough for every CLI command.
    pub fn manager(&self) -> Result<ShardManager> {
        ShardManager::new(self.sharding.clone(), Arc::new(StaticRegistry::new()))
            .context("Failed to build shard manager")
    }

    /// Mutable access to a mapping's configuration.
    pub fn mapping_mut(&mut self, id: &MappingId) -> Result<&mut MappingConfig> {
        match self.sharding.mappings.iter_mut().find(|m| &m.id == id) {
            Some(mapping) => Ok(mapping),
            None => bail!(ShardError::UnknownMapping(id.clone())),
        }
    }
}

/// Resolve the config file: an explicit path, or the nearest
/// `shardkit.toml` in the current or parent directories.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    match find_config_file(&cwd) {
        Some(path) => Ok(path),
        None => bail!(
            "No {} found. Run {} first.",
            CONFIG_FILE,
            "shardkit init".cyan()
        ),
    }
}

/// Find shardkit.toml in `start` or its parent directories.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

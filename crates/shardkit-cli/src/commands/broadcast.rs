//! List every shard a broadcast reaches.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::config::Config;

pub fn run(config_path: &Path, mapping_id: &str) -> Result<()> {
    let manager = Config::load(config_path)?.manager()?;
    let shards = manager.dispatcher().broadcast(mapping_id)?;

    if shards.is_empty() {
        println!("{} Mapping {} has no nodes", "•".yellow(), mapping_id.cyan());
        return Ok(());
    }

    println!(
        "{}",
        format!("Broadcast on {} reaches {} shard(s)", mapping_id, shards.len())
            .white()
            .bold()
    );
    for (i, shard) in shards.iter().enumerate() {
        println!(
            "  {} {:<16} read {:<18} write {}",
            format!("{}.", i + 1).blue(),
            shard.node_id().as_str().cyan(),
            shard.read_source().as_str(),
            shard.write_source().as_str()
        );
    }
    Ok(())
}

//! Resolve a shard key to its node.

use anyhow::Result;
use colored::Colorize;
use shardkit::prelude::*;
use std::path::Path;

use crate::config::Config;

pub fn run(config_path: &Path, mapping_id: &str, key: &str, write: bool) -> Result<()> {
    let manager = Config::load(config_path)?.manager()?;
    let (role, node, source) = resolve(&manager, mapping_id, key, write)?;

    println!(
        "{} {} → {} ({} source {})",
        mapping_id.dimmed(),
        key.white().bold(),
        node.as_str().cyan(),
        role,
        source.as_str().green()
    );
    Ok(())
}

/// The node owning `key` and the source its role connects to.
fn resolve(
    manager: &ShardManager,
    mapping_id: &str,
    key: &str,
    write: bool,
) -> Result<(ConnectionRole, NodeId, SourceId)> {
    let dispatcher = manager.dispatcher();
    let (role, shard) = if write {
        (ConnectionRole::Write, dispatcher.route_write(mapping_id, key)?)
    } else {
        (ConnectionRole::Read, dispatcher.route_read(mapping_id, key)?)
    };
    Ok((role, shard.node_id().clone(), shard.source(role).clone()))
}

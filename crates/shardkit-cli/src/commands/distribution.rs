//! Key distribution histogram for a mapping.

use anyhow::{bail, Result};
use colored::Colorize;
use shardkit::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::config::Config;

/// Width of a full histogram bar.
const BAR_WIDTH: usize = 40;

pub fn run(config_path: &Path, mapping_id: &str, keys: usize) -> Result<()> {
    if keys == 0 {
        bail!("--keys must be greater than 0");
    }
    let manager = Config::load(config_path)?.manager()?;
    let mapping = manager.load_shard_mapping(mapping_id)?;
    let counts = histogram(&mapping, keys)?;

    println!(
        "{}",
        format!("Distribution of {} keys on {} ({})", keys, mapping_id, mapping.strategy())
            .white()
            .bold()
    );
    println!("{}", "═".repeat(60).dimmed());

    let ideal = keys as f64 / counts.len().max(1) as f64;
    let largest = counts.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    for (node, count) in &counts {
        let bar = "█".repeat(count * BAR_WIDTH / largest);
        let share = *count as f64 / keys as f64 * 100.0;
        let deviation = (*count as f64 - ideal) / ideal * 100.0;
        println!(
            "  {:<16} {:>8} {:>6.2}% {:>+7.1}%  {}",
            node.as_str().cyan(),
            count,
            share,
            deviation,
            bar.green()
        );
    }
    Ok(())
}

/// Keys per node in configured node order, over `key:0..key:{keys}`.
fn histogram(mapping: &ShardMapping, keys: usize) -> Result<Vec<(NodeId, usize)>> {
    let mut counts: HashMap<NodeId, usize> = HashMap::new();
    for i in 0..keys {
        let node = mapping.resolve(format!("key:{}", i))?;
        *counts.entry(node).or_insert(0) += 1;
    }
    Ok(mapping
        .node_ids()
        .into_iter()
        .map(|node| {
            let count = counts.get(&node).copied().unwrap_or(0);
            (node, count)
        })
        .collect())
}

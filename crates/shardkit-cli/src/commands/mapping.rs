//! Inspect and edit shard mappings.

use anyhow::Result;
use colored::Colorize;
use shardkit::prelude::*;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;

/// Keys sampled to estimate how much data a topology change moves.
const MOVE_SAMPLES: usize = 10_000;

pub fn list(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let mappings = &config.sharding.mappings;

    if mappings.is_empty() {
        println!("{} No mappings defined in {}", "•".yellow(), config_path.display());
        return Ok(());
    }

    println!("{}", "Shard Mappings".white().bold());
    println!("{}", "═".repeat(40).dimmed());
    for mapping in mappings {
        println!(
            "  {:<20} {:<8} {} node(s)",
            mapping.id.as_str().cyan(),
            mapping.hash.to_string(),
            mapping.nodes.len()
        );
    }

    Ok(())
}

pub fn show(config_path: &Path, mapping_id: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let manager = config.manager()?;
    let mapping = manager.load_shard_mapping(mapping_id)?;
    let mapping_config = mapping.config();

    println!("{}", format!("Mapping {}", mapping_config.id).white().bold());
    println!("{}", "═".repeat(60).dimmed());
    println!("  Strategy:          {}", mapping_config.hash.to_string().cyan());
    if mapping_config.hash == HashStrategy::Ring {
        println!("  Replicas:          {}", mapping_config.replicas.to_string().cyan());
    }
    println!();

    println!(
        "  {:<16} {:>6} {:<18} {:<18} {:>7}",
        "NODE".blue().bold(),
        "WEIGHT".blue().bold(),
        "READ".blue().bold(),
        "WRITE".blue().bold(),
        "POINTS".blue().bold()
    );
    for node in &mapping_config.nodes {
        println!(
            "  {:<16} {:>6} {:<18} {:<18} {:>7}",
            node.id.as_str(),
            node.weight,
            node.read_source().as_str(),
            node.write_source().as_str(),
            virtual_points(mapping_config, node)
        );
    }

    Ok(())
}

pub fn add_node(
    config_path: &Path,
    mapping_id: &str,
    node_id: &str,
    weight: u32,
    read: Option<String>,
    write: Option<String>,
) -> Result<()> {
    let mut config = Config::load(config_path)?;
    let id = MappingId::from(mapping_id);
    let mut mapping = editable(&mut config, &id)?;

    let mut node = NodeConfig::new(node_id).with_weight(weight);
    if let Some(source) = read {
        node = node.with_read_source(source);
    }
    if let Some(source) = write {
        node = node.with_write_source(source);
    }

    let before = sample_owners(&mapping);
    mapping.add_node(node)?;
    let moved = moved_share(&before, &sample_owners(&mapping));

    *config.mapping_mut(&id)? = mapping.config().clone();
    config.save(config_path)?;

    println!("{} Added {} to {}", "✓".green(), node_id.cyan(), mapping_id.cyan());
    println!("  ~{:.1}% of keys now route to {}", moved * 100.0, node_id);
    Ok(())
}

pub fn remove_node(config_path: &Path, mapping_id: &str, node_id: &str) -> Result<()> {
    let mut config = Config::load(config_path)?;
    let id = MappingId::from(mapping_id);
    let mut mapping = editable(&mut config, &id)?;

    let before = sample_owners(&mapping);
    mapping.remove_node(&NodeId::from(node_id))?;
    let moved = moved_share(&before, &sample_owners(&mapping));

    *config.mapping_mut(&id)? = mapping.config().clone();
    config.save(config_path)?;

    println!("{} Removed {} from {}", "✓".green(), node_id.cyan(), mapping_id.cyan());
    println!("  ~{:.1}% of keys changed owner", moved * 100.0);
    Ok(())
}

/// An owned mapping for in-memory topology edits.
fn editable(config: &mut Config, id: &MappingId) -> Result<ShardMapping> {
    let mapping_config = config.mapping_mut(id)?.clone();
    Ok(ShardMapping::new(mapping_config, Arc::new(StaticRegistry::new()))?)
}

fn virtual_points(mapping: &MappingConfig, node: &NodeConfig) -> String {
    match mapping.hash {
        HashStrategy::Ring => (u64::from(node.weight) * u64::from(mapping.replicas)).to_string(),
        HashStrategy::Modulo => "-".to_string(),
    }
}

/// Owner of every sample key; `None` when the mapping has no nodes.
fn sample_owners(mapping: &ShardMapping) -> Vec<Option<NodeId>> {
    (0..MOVE_SAMPLES)
        .map(|i| mapping.resolve(format!("key:{}", i)).ok())
        .collect()
}

fn moved_share(before: &[Option<NodeId>], after: &[Option<NodeId>]) -> f64 {
    if before.is_empty() {
        return 0.0;
    }
    let moved = before.iter().zip(after).filter(|(b, a)| b != a).count();
    moved as f64 / before.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;
    use tempfile::TempDir;

    fn project() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        Config::starter().save(&path).unwrap();
        (dir, path)
    }

    #[test]
    fn test_add_node_persists() {
        let (_dir, path) = project();
        add_node(&path, "M_store_id", "node3", 2, Some("node3_ro".into()), None).unwrap();

        let config = Config::load(&path).unwrap();
        let node = config.sharding.mappings[0]
            .node(&NodeId::from("node3"))
            .unwrap()
            .clone();
        assert_eq!(node.weight, 2);
        assert_eq!(node.read_source(), SourceId::from("node3_ro"));
        assert_eq!(node.write_source(), SourceId::from("node3"));
    }

    #[test]
    fn test_add_duplicate_node_leaves_file_untouched() {
        let (_dir, path) = project();
        let before = std::fs::read_to_string(&path).unwrap();
        assert!(add_node(&path, "M_store_id", "node1", 1, None, None).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_remove_node_persists() {
        let (_dir, path) = project();
        remove_node(&path, "M_store_id", "node1").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sharding.mappings[0].node_ids(), vec![NodeId::from("node2")]);
        assert!(remove_node(&path, "M_store_id", "node1").is_err());
    }

    #[test]
    fn test_unknown_mapping() {
        let (_dir, path) = project();
        let err = show(&path, "M_nope").unwrap_err();
        assert_eq!(err.to_string(), "mapping 'M_nope' is undefined");
    }

    #[test]
    fn test_moved_share() {
        let a = Some(NodeId::from("a"));
        let b = Some(NodeId::from("b"));
        let before = vec![a.clone(), a.clone(), b.clone(), b.clone()];
        let after = vec![a.clone(), b.clone(), b.clone(), b];
        assert_eq!(moved_share(&before, &after), 0.25);
        assert_eq!(moved_share(&[], &[]), 0.0);
    }

    #[test]
    fn test_virtual_points() {
        let ring = MappingConfig::new("M", HashStrategy::Ring).with_replicas(10);
        let modulo = MappingConfig::new("M", HashStrategy::Modulo);
        let node = NodeConfig::new("n").with_weight(3);
        assert_eq!(virtual_points(&ring, &node), "30");
        assert_eq!(virtual_points(&modulo, &node), "-");
    }
}

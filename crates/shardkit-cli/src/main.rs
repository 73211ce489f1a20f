//! shardkit CLI - inspect and edit shard mappings.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "shardkit")]
#[command(author, version, about = "shardkit - consistent-hash shard routing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to shardkit.toml (default: nearest in current or parent directories)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new shardkit project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Inspect and edit mappings
    Mapping {
        #[command(subcommand)]
        command: MappingCommands,
    },

    /// Resolve a shard key to its node
    Route {
        /// Mapping id
        mapping: String,

        /// Shard key
        key: String,

        /// Show the write source instead of the read source
        #[arg(short, long)]
        write: bool,
    },

    /// List every shard of a mapping in broadcast order
    Broadcast {
        /// Mapping id
        mapping: String,
    },

    /// Show how synthetic keys spread over a mapping's nodes
    Distribution {
        /// Mapping id
        mapping: String,

        /// Number of keys to sample
        #[arg(short, long, default_value = "10000")]
        keys: usize,
    },
}

#[derive(Subcommand)]
enum MappingCommands {
    /// List mappings
    List,

    /// Show nodes of a mapping
    Show {
        /// Mapping id
        id: String,
    },

    /// Add a node to a mapping
    AddNode {
        /// Mapping id
        id: String,

        /// Node id
        node: String,

        /// Node weight
        #[arg(long, default_value = "1")]
        weight: u32,

        /// Read source id (default: node id)
        #[arg(long)]
        read: Option<String>,

        /// Write source id (default: node id)
        #[arg(long)]
        write: Option<String>,
    },

    /// Remove a node from a mapping
    RemoveNode {
        /// Mapping id
        id: String,

        /// Node id
        node: String,
    },
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = || -> Result<PathBuf> {
        let path = config::resolve_config_path(cli.config.as_deref())?;
        tracing::debug!("Using config {}", path.display());
        Ok(path)
    };

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Mapping { command } => {
            let config_path = config_path()?;
            match command {
                MappingCommands::List => commands::mapping::list(&config_path),
                MappingCommands::Show { id } => commands::mapping::show(&config_path, &id),
                MappingCommands::AddNode {
                    id,
                    node,
                    weight,
                    read,
                    write,
                } => commands::mapping::add_node(&config_path, &id, &node, weight, read, write),
                MappingCommands::RemoveNode { id, node } => {
                    commands::mapping::remove_node(&config_path, &id, &node)
                }
            }
        }
        Commands::Route {
            mapping,
            key,
            write,
        } => commands::route::run(&config_path()?, &mapping, &key, write),
        Commands::Broadcast { mapping } => commands::broadcast::run(&config_path()?, &mapping),
        Commands::Distribution { mapping, keys } => {
            commands::distribution::run(&config_path()?, &mapping, keys)
        }
    }
}

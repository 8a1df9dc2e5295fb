use anyhow::Result;
use clap::Parser;
use peervault_core::config::Config;
use peervault_core::core_alloc::{PartitionAllocator, PeerId};
use peervault_core::core_node::{Node, StaticMembership};
use peervault_core::core_server::describe_metrics;
use peervault_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use peervault_core::shutdown::{install_signal_handlers, ShutdownCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "peervault")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for per-peer table files
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Identity of this node
    #[arg(long)]
    local_id: Option<String>,

    /// Peer to serve storage for (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Fraction of the byte budget to fill, in (0, 1]
    #[arg(long)]
    threshold: Option<f64>,

    /// Number of ticks between reallocations
    #[arg(long)]
    steps_per_reallocate: Option<u64>,

    /// Destructively reinitialize all peer tables at startup
    #[arg(long)]
    restart: bool,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Overlay command-line values onto the loaded configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(data_root) = &self.data_root {
            config.storage.data_root = data_root.clone();
        }
        if let Some(local_id) = &self.local_id {
            config.node.local_id = local_id.clone();
        }
        if let Some(threshold) = self.threshold {
            config.allocation.threshold = threshold;
        }
        if let Some(steps) = self.steps_per_reallocate {
            config.node.steps_per_reallocate = steps;
        }
        if self.restart {
            config.allocation.restart = true;
        }
        config.logging.level = self.log_level.clone();
        if self.json_logs {
            config.logging.json_format = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    args.apply_to(&mut config);
    config.validate()?;

    let log_level = LogLevel::from_str(&config.logging.level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", config.logging.level);
        LogLevel::Info
    });
    init_logging_with_config(
        LogConfig::new(log_level)
            .with_target(config.logging.with_target)
            .json_format(config.logging.json_format),
    )?;
    describe_metrics();

    info!(
        local_id = %config.node.local_id,
        data_root = %config.storage.data_root.display(),
        "starting peervault node"
    );
    if config.allocation.restart {
        warn!("restart flag set: all peer tables will be rebuilt");
    }
    if args.peers.is_empty() {
        warn!("no peers configured; the node will not allocate any storage");
    }

    let local_id = PeerId::from(config.node.local_id.clone());
    let membership = Arc::new(StaticMembership::new(
        args.peers.iter().map(|p| PeerId::from(p.as_str())).collect(),
    ));
    let allocator = Arc::new(PartitionAllocator::new(
        local_id,
        config.storage.data_root.clone(),
        config.allocation.budget_bytes,
    ));

    let shutdown = Arc::new(ShutdownCoordinator::new());
    install_signal_handlers(shutdown.clone());

    let node = Node::start(&config, membership, allocator, shutdown).await?;
    // A request transport would take node.service() here and start
    // dispatching Store/Retrieve calls with authenticated senders.
    node.run().await;

    info!("peervault node stopped");
    Ok(())
}

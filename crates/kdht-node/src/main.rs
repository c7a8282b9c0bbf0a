//! kdht-node - standalone k-DHT node process.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::Config;
use kdht_core::id::KEY_BYTES;
use kdht_core::Id;
use kdht_dht::Node;

#[derive(Parser)]
#[command(name = "kdht-node")]
#[command(about = "A Kademlia-style distributed hash table node", long_about = None)]
struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a node, serving requests until interrupted.
    Run {
        /// Path to a TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to bind the listener on (overrides config).
        #[arg(short, long)]
        listen: Option<String>,

        /// Hex-encoded 20-byte node id (overrides config).
        #[arg(long)]
        id: Option<String>,

        /// Generate a random node id instead of using --id or the config.
        #[arg(long)]
        random_id: bool,

        /// Nodes per k-bucket (overrides config).
        #[arg(long)]
        k: Option<usize>,

        /// Lookup parallelism (overrides config).
        #[arg(long)]
        alpha: Option<usize>,

        /// Bootstrap neighbor address. May be repeated.
        #[arg(long = "neighbor")]
        neighbors: Vec<String>,
    },

    /// Print a freshly generated random node id and exit.
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match cli.command {
        Commands::Run {
            config,
            listen,
            id,
            random_id,
            k,
            alpha,
            neighbors,
        } => run(config, listen, id, random_id, k, alpha, neighbors).await,
        Commands::Keygen => {
            let id = kdht_dht::generate_random_id();
            println!("{}", hex::encode(id));
            Ok(())
        }
    }
}

async fn run(
    config_path: Option<PathBuf>,
    listen: Option<String>,
    id: Option<String>,
    random_id: bool,
    k: Option<usize>,
    alpha: Option<usize>,
    neighbors: Vec<String>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(listen) = listen {
        config.listen = listen;
    }
    if let Some(k) = k {
        config.k = k;
    }
    if let Some(alpha) = alpha {
        config.alpha = alpha;
    }
    if !neighbors.is_empty() {
        config.neighbors = neighbors;
    }
    if let Some(id) = id {
        config.id = Some(id);
    }

    let node_id = if random_id {
        kdht_dht::generate_random_id()
    } else {
        match &config.id {
            Some(hex_id) => parse_id(hex_id)?,
            None => kdht_dht::generate_random_id(),
        }
    };

    tracing::info!(id = %hex::encode(node_id), "starting node");

    let node = Node::bind(node_id, &config.listen, config.k, config.alpha, config.neighbors)
        .await
        .context("binding node listener")?;

    tracing::info!(address = %node.info().address(), "node listening");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("received shutdown signal");

    node.shutdown().ok();
    tracing::info!("node shut down");

    Ok(())
}

fn parse_id(hex_id: &str) -> Result<Id> {
    let bytes = hex::decode(hex_id).context("id is not valid hex")?;
    if bytes.len() != KEY_BYTES {
        bail!("id must be {} bytes (got {})", KEY_BYTES, bytes.len());
    }
    let mut id = [0u8; KEY_BYTES];
    id.copy_from_slice(&bytes);
    Ok(id)
}

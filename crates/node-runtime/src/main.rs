//! # Quorum-Names Node Runtime
//!
//! ```text
//! node-runtime keygen-cold
//! node-runtime keygen-hot --cold-secret <hex>
//! node-runtime start --config node.toml
//! node-runtime resolve --config node.toml h/example
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `QN_*` environment overrides)
//! 2. Load and check the signing identity
//! 3. Restore the snapshot
//! 4. Start the dispatcher and the sync, hot-key and gossip loops
//! 5. Wait for Ctrl-C, signal shutdown, persist

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::keys;
use node_runtime::{resolve_once, NodeConfig, NodeRuntime};

#[derive(Parser)]
#[command(version, about = "Quorum-Names signer node")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a cold (identity) keypair.
    KeygenCold,

    /// Generate a hot keypair bound to a cold key.
    KeygenHot {
        /// Hex seed of the cold key.
        #[arg(long)]
        cold_secret: String,
    },

    /// Run the node until Ctrl-C.
    Start {
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Resolve one name through the signer quorum.
    Resolve {
        #[arg(short, long)]
        config: PathBuf,
        /// Name to look up, e.g. `h/example`.
        name: String,
    },
}

/// Load configuration from file and environment.
fn load_config(path: &Path) -> Result<NodeConfig> {
    let mut config = NodeConfig::load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    config.apply_env_overrides();
    Ok(config)
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run_node(config: &NodeConfig) -> Result<()> {
    info!("===========================================");
    info!("  Quorum-Names Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let mut node = NodeRuntime::new(config).await?;
    node.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::KeygenCold => println!("{}", keys::generate_cold()),
        Commands::KeygenHot { cold_secret } => {
            let output = keys::generate_hot(&cold_secret).context("Failed to bind hot key")?;
            println!("{}", output);
        }
        Commands::Start { config } => {
            init_logging()?;
            let config = load_config(&config)?;
            run_node(&config).await?;
        }
        Commands::Resolve { config, name } => {
            init_logging()?;
            let config = load_config(&config)?;
            let record = resolve_once(&config, &name).await?;
            println!("name      {}", record.content.name);
            println!("next      {}", record.content.next_name);
            println!("height    {}", record.content.height);
            println!("value     {}", record.content.value);
            println!("peer      {}", record.peer);
            for (signer, _) in record.signatures.iter() {
                println!("signed-by {}", signer);
            }
        }
    }
    Ok(())
}

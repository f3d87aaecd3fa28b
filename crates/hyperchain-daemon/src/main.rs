// crates/hyperchain-daemon/src/main.rs
//
// Binary entrypoint for the Hyperchain validator daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, builds the
// node context, enrolls the locally operated validators, and runs the
// background workers until Ctrl-C.

mod collaborators;
mod config;
mod scheduler;
mod shared;
mod workers;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use collaborators::{LoggingBroadcaster, StaticProbe};
use config::DaemonConfig;
use hyperchain_core::{NullOracle, SystemClock, TransactionSource};
use shared::NodeContext;

/// Hyperchain daemon: runs a DPoQS validator node.
#[derive(Parser, Debug)]
#[command(name = "hyperchain-daemon", version = "0.1.0", about = "Hyperchain DPoQS validator node")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "hyperchain.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load before initializing tracing so the configured log level applies;
    // the outcome is reported once the subscriber is up.
    let loaded = DaemonConfig::load(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let daemon_config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", args.config);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                args.config,
                e
            );
            DaemonConfig::default()
        }
    }
    .validated();

    tracing::info!("Hyperchain Daemon v0.1.0");
    tracing::info!("TPS target: {}", daemon_config.tps_target);
    tracing::info!("Block time: {}s", daemon_config.block_time);
    tracing::info!("Shards: {}", daemon_config.sharding_factor);
    tracing::info!("Minimum stake: {}", daemon_config.min_stake);
    tracing::info!("Port: {}", daemon_config.port);
    tracing::info!("Signature algorithms: {:?}", daemon_config.signature_algorithms);

    let ctx = NodeContext::new(
        daemon_config,
        Arc::new(SystemClock),
        Arc::new(NullOracle),
        Arc::new(StaticProbe::default()),
        Arc::new(LoggingBroadcaster),
    );

    let enrolled = ctx.enroll_configured();
    if enrolled == 0 {
        tracing::warn!(
            "No local validators enrolled. Add [[validators]] entries to {} to produce blocks.",
            args.config
        );
    } else {
        tracing::info!("Enrolled {} local validators", enrolled);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tasks = workers::spawn_all(&ctx, shutdown_rx);
    let names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
    tracing::info!("Started workers: {:?}", names);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        task.join().await;
    }

    let uptime = ctx.start_time.elapsed();
    for stats in ctx.coordinator.shard_stats() {
        tracing::info!(
            "Shard {}: {} blocks, {} transactions",
            stats.shard_id,
            stats.block_count,
            stats.transaction_count
        );
    }
    tracing::info!("{} transactions left in the pool", ctx.pool.size());
    tracing::info!("Hyperchain daemon shut down gracefully after {:?}", uptime);

    Ok(())
}

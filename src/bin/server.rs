//! exokv Server Binary
//!
//! Starts the TCP server for exokv.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use exokv::network::Server;
use exokv::sweeper::log_eviction;
use exokv::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// exokv Server
#[derive(Parser, Debug)]
#[command(name = "exokv-server")]
#[command(about = "In-memory key-value store with TTLs, sorted sets and snapshots")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:15000")]
    listen: String,

    /// Snapshot file used at startup, by SAVE/LOAD and at shutdown
    #[arg(short, long, default_value = "./exokv.snapshot")]
    snapshot: PathBuf,

    /// Expiration sweep interval in seconds
    #[arg(long, default_value = "30")]
    sweep_secs: u64,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Do not write a snapshot on shutdown
    #[arg(long)]
    no_save: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,exokv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("exokv Server v{}", exokv::VERSION);
    tracing::info!("Snapshot file: {}", args.snapshot.display());
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .snapshot_path(&args.snapshot)
        .sweep_interval(Duration::from_secs(args.sweep_secs))
        .max_connections(args.max_connections)
        .save_on_shutdown(!args.no_save)
        .build();

    let store = match Store::new(config.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Restore the previous state; a bad snapshot is not fatal
    if config.snapshot_path.exists() {
        if let Err(e) = store.load_snapshot() {
            tracing::error!("Failed to load snapshot, starting empty: {}", e);
        }
    }

    store.set_eviction_hook(Some(log_eviction()));
    if let Err(e) = store.start_sweeper() {
        tracing::error!("Failed to start expiration sweeper: {}", e);
        std::process::exit(1);
    }

    let server = match Server::bind(config.clone(), Arc::clone(&store)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    let ctrlc_shutdown = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        ctrlc_shutdown.request(true);
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    // Stop the sweeper, then save
    let save = config.save_on_shutdown && !shutdown.save_skipped();
    match store.shutdown(save) {
        Ok(Some(stats)) => tracing::info!("Final snapshot written ({} bytes)", stats.bytes),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Final snapshot failed: {}", e);
            std::process::exit(1);
        }
    }

    tracing::info!("Server stopped");
}

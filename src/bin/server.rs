//! RungKV Server Binary
//!
//! Attaches (or creates) the shared-memory region and serves it over TCP.

use clap::Parser;
use rungkv::network::Server;
use rungkv::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// RungKV Server
#[derive(Parser, Debug)]
#[command(name = "rungkv-server")]
#[command(about = "Ordered key-value store over a shared-memory ranked skip list")]
#[command(version)]
struct Args {
    /// Backing file for the shared-memory region
    #[arg(short, long, default_value = "./rungkv_region")]
    region: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8089")]
    listen: String,

    /// Reformat the region even if it holds resumable data
    #[arg(long)]
    fresh: bool,

    /// Slot capacity when the region is formatted fresh
    #[arg(short, long, default_value = "1024")]
    capacity: u64,

    /// Maximum node height for a freshly formatted region
    #[arg(long, default_value = "32")]
    level_capacity: usize,

    /// Connections queued for the worker before accepts block
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Delete the region file on shutdown instead of keeping it
    #[arg(long)]
    discard_on_exit: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rungkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RungKV Server v{}", rungkv::VERSION);
    tracing::info!("Region file: {}", args.region);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .region_path(&args.region)
        .resume(!args.fresh)
        .initial_capacity(args.capacity)
        .level_capacity(args.level_capacity)
        .delete_region_on_close(args.discard_on_exit)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .build();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

//! RungKV CLI Client
//!
//! One-shot get/set/del against a running rungkv-server.

use clap::{Parser, Subcommand};
use rungkv::network::Client;
use rungkv::RungError;

/// RungKV CLI
#[derive(Parser, Debug)]
#[command(name = "rungkv-cli")]
#[command(about = "CLI for the rungkv key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8089")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Look a key up, printing its value and rank
    Get {
        /// The key to look up
        key: String,
    },

    /// Insert a key-value pair
    Set {
        /// The key to insert
        key: String,

        /// The value to store
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },
}

fn main() {
    let args = Args::parse();
    let client = Client::new(&args.server);

    let outcome = match &args.command {
        Commands::Get { key } => client.get(key.as_bytes()).map(|(value, rank)| {
            println!("{} (rank {rank})", value.to_string_lossy());
        }),
        Commands::Set { key, value } => client
            .set(key.as_bytes(), value.as_bytes())
            .map(|()| println!("OK")),
        Commands::Del { key } => client.del(key.as_bytes()).map(|()| println!("OK")),
    };

    if let Err(e) = outcome {
        match e {
            RungError::KeyNotFound => eprintln!("(not found)"),
            RungError::DuplicateKey => eprintln!("(already exists)"),
            other => eprintln!("error: {other}"),
        }
        std::process::exit(1);
    }
}

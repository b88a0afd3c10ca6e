//! Farmers Market CLI - cart checkout and order tools.
//!
//! # Usage
//!
//! ```bash
//! # Show a cart file's lines and total without ordering
//! fm-cli cart --cart cart.json
//!
//! # Check a cart file out as buyer 2
//! fm-cli checkout --cart cart.json --buyer 2 --name "Jane Doe"
//!
//! # List buyer 2's orders from the local order store
//! fm-cli --backend local orders --buyer 2
//! ```
//!
//! # Commands
//!
//! - `cart` - Summarize a cart file
//! - `checkout` - Submit a cart file as an order
//! - `orders` - List orders
//!
//! The order backend comes from `ORDER_BACKEND` (see
//! `farmers_market_cart::config`) unless `--backend` overrides it.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farmers_market_cart::{BackendKind, MarketConfig};
use farmers_market_core::BuyerId;

mod commands;

#[derive(Parser)]
#[command(name = "fm-cli")]
#[command(author, version, about = "Farmers Market CLI tools")]
struct Cli {
    /// Order backend (`http` or `local`); overrides `ORDER_BACKEND`
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a cart file
    Cart {
        /// JSON file with `[{ "product": {...}, "quantity": N }]`
        #[arg(short, long)]
        cart: PathBuf,
    },
    /// Submit a cart file as an order
    Checkout {
        /// JSON file with `[{ "product": {...}, "quantity": N }]`
        #[arg(short, long)]
        cart: PathBuf,

        /// Buyer (user) ID placing the order
        #[arg(short, long)]
        buyer: BuyerId,

        /// Buyer display name
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// List orders
    Orders {
        /// Only show this buyer's orders
        #[arg(short, long)]
        buyer: Option<BuyerId>,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "farmers_market_cart=info,farmers_market_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cart { cart } => commands::checkout::summarize(&cart).await?,
        Commands::Checkout { cart, buyer, name } => {
            let config = load_config(cli.backend)?;
            commands::checkout::submit(&config, &cart, buyer, &name).await?;
        }
        Commands::Orders { buyer } => {
            let config = load_config(cli.backend)?;
            commands::orders::list(&config, buyer).await?;
        }
    }
    Ok(())
}

fn load_config(backend: Option<BackendKind>) -> Result<MarketConfig, Box<dyn std::error::Error>> {
    let mut config = MarketConfig::from_env()?;
    if let Some(backend) = backend {
        config.backend = backend;
    }
    Ok(config)
}

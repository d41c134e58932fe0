//! Essence CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Create the storefront schema
//! essence-cli migrate
//!
//! # Load the demo catalog, demo user, and reviews
//! essence-cli seed
//!
//! # Wipe every collection first, then seed
//! essence-cli seed --reset
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the database with demo data

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "essence-cli")]
#[command(author, version, about = "Essence storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database with the demo catalog
    Seed {
        /// Delete all users, products, reviews, and carts first
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { reset } => commands::seed::demo_data(reset).await?,
    }
    Ok(())
}

//! Saumara CLI - Database migrations and operations tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! saumara-cli migrate
//!
//! # Load (or update) the catalog from YAML
//! saumara-cli seed products catalog.yaml
//!
//! # Inspect orders
//! saumara-cli orders list
//! saumara-cli orders show SAU-LX2K9A-7Q3F
//!
//! # Find charged payments that never became orders
//! saumara-cli reconcile payment-failures.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `SAUMARA_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "saumara-cli")]
#[command(author, version, about = "Saumara CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect placed orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Report logged payment failures that still have no order
    Reconcile {
        /// Path to the JSON-lines failure log
        failure_log: PathBuf,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert or update catalog products from a YAML file
    Products {
        /// Path to the YAML catalog
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List every order, newest first
    List,
    /// Show one order by its number
    Show {
        /// Order number, e.g. `SAU-LX2K9A-7Q3F`
        order_number: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await,
        },
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list().await,
            OrdersAction::Show { order_number } => commands::orders::show(&order_number).await,
        },
        Commands::Reconcile { failure_log } => commands::reconcile::run(&failure_log).await,
    }
}

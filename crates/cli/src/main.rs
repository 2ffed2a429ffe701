//! Gift registry CLI - database migrations and registry management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! registry-cli migrate
//!
//! # Manage items
//! registry-cli items list
//! registry-cli items add --name "Stroller" --price "CHF 300"
//! registry-cli items remove --id 4
//! registry-cli items import items.yaml
//!
//! # Owner notification recipients
//! registry-cli recipients set "mum@home.ch, dad@home.ch"
//! registry-cli recipients show
//! ```
//!
//! All commands read `REGISTRY_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(author, version, about = "Gift registry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage registry items
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
    /// Manage owner notification recipients
    Recipients {
        #[command(subcommand)]
        action: RecipientsAction,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List all items, newest first
    List,
    /// Add an item
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Shop or product link
        #[arg(short, long)]
        url: Option<String>,

        /// Free-text price, e.g. "CHF 40"
        #[arg(short, long)]
        price: Option<String>,

        /// Free-text size
        #[arg(short, long)]
        size: Option<String>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove an item
    Remove {
        /// Item ID
        #[arg(short, long)]
        id: i64,
    },
    /// Import items from a YAML file
    Import {
        /// Path to a YAML list of items
        file: String,
    },
}

#[derive(Subcommand)]
enum RecipientsAction {
    /// Replace the recipient list
    Set {
        /// Comma-separated email addresses
        emails: String,
    },
    /// Show the recipient list
    Show,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Items { action } => match action {
            ItemsAction::List => commands::items::list().await?,
            ItemsAction::Add {
                name,
                url,
                price,
                size,
                notes,
            } => {
                commands::items::add(commands::items::ItemFields {
                    name,
                    url,
                    price,
                    size,
                    notes,
                })
                .await?;
            }
            ItemsAction::Remove { id } => commands::items::remove(id).await?,
            ItemsAction::Import { file } => commands::items::import(&file).await?,
        },
        Commands::Recipients { action } => match action {
            RecipientsAction::Set { emails } => commands::recipients::set(&emails).await?,
            RecipientsAction::Show => commands::recipients::show().await?,
        },
    }
    Ok(())
}

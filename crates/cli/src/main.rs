//! Storerate CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! storerate-cli migrate
//!
//! # Create an administrator
//! storerate-cli admin create -e admin@example.com -n "Platform Admin" \
//!     -a "1 Main Street" -p 'Secret#123'
//!
//! # Seed demo users, owners, stores and ratings
//! storerate-cli seed
//! ```
//!
//! # Environment Variables
//!
//! - `STORERATE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `OWNERSHIP_ADMIN_POLICY` - `preserve` (default) or `promote`, used by `seed`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "storerate-cli")]
#[command(author, version, about = "Storerate CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database with demo data
    Seed,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new administrator
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name (6-60 characters)
        #[arg(short, long)]
        name: String,

        /// Postal address
        #[arg(short, long)]
        address: String,

        /// Password (8-16 characters, one uppercase, one special)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                address,
                password,
            } => {
                commands::admin::create_user(email, name, address, password).await?;
            }
        },
        Commands::Seed => commands::seed::demo().await?,
    }
    Ok(())
}

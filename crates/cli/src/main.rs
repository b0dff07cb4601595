//! Atelier CLI - Role, checkout session and catalog tools.
//!
//! Talks to the marketplace backend directly, acting for the identity whose
//! delegation is in the environment.
//!
//! # Usage
//!
//! ```bash
//! # Grant admin to a principal (caller must be admin)
//! atelier-cli role assign -p rdmx6-jaaaa-aaaaa-aaadq-cai -r admin
//!
//! # Show the caller's role
//! atelier-cli role show
//!
//! # Look up a Stripe checkout session
//! atelier-cli session status cs_test_123
//!
//! # List items, optionally by category
//! atelier-cli items list -c music
//!
//! # Create items from a YAML file as the caller
//! atelier-cli items seed catalog.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL` - Marketplace backend RPC endpoint (required)
//! - `BACKEND_TIMEOUT_SECS` - Per-call timeout (default: 30)
//! - `ATELIER_PRINCIPAL` - Principal to act as (anonymous if unset)
//! - `ATELIER_DELEGATION` - Delegation credential for `ATELIER_PRINCIPAL`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
    /// Inspect Stripe checkout sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Inspect and seed the catalog
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Assign a role to a principal
    Assign {
        /// Principal to update
        #[arg(short, long)]
        principal: String,

        /// Role (`admin`, `user`, `guest`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Show the caller's principal and role
    Show,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the status of a checkout session
    Status {
        /// Stripe checkout session ID
        session_id: String,
    },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// List items
    List {
        /// Only items in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Create items from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
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
    let actor = commands::connect()?;

    match cli.command {
        Commands::Role { action } => match action {
            RoleAction::Assign { principal, role } => {
                commands::role::assign(&actor, &principal, &role).await?;
            }
            RoleAction::Show => commands::role::show(&actor).await?,
        },
        Commands::Session { action } => match action {
            SessionAction::Status { session_id } => {
                commands::session::status(&actor, &session_id).await?;
            }
        },
        Commands::Items { action } => match action {
            ItemsAction::List { category } => {
                commands::items::list(&actor, category.as_deref()).await?;
            }
            ItemsAction::Seed { file } => commands::items::seed(&actor, &file).await?,
        },
    }
    Ok(())
}

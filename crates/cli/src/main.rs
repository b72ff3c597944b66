//! Addressbook CLI - schema setup, seeding and user management.
//!
//! # Usage
//!
//! ```bash
//! # Create all tables (safe to repeat)
//! ab-cli schema
//!
//! # Permission catalog, admin role and bootstrap admin
//! ab-cli seed
//!
//! # Create a user (password from --password or AB_CLI_PASSWORD)
//! ab-cli user create -u alice -e alice@example.com
//!
//! # Give a user a role
//! ab-cli user grant-role -u alice -r viewer
//! ```
//!
//! Connection settings are the server's (`APP_STORE`, `DATABASE_URL` or
//! `APP_DB_*`, `DEVICE_DB_*`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ab-cli")]
#[command(author, version, about = "Addressbook CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create all tables if they do not exist
    Schema,
    /// Seed the permission catalog, the admin role and the bootstrap admin
    Seed,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (falls back to `AB_CLI_PASSWORD`)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Assign an existing role to a user
    GrantRole {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Role name
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Schema => commands::schema::run().await,
        Commands::Seed => commands::seed::run().await,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
            } => commands::user::create(&username, &email, password).await,
            UserAction::GrantRole { username, role } => {
                commands::user::grant_role(&username, &role).await
            }
        },
    }
}

//! Rounds CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rounds-cli migrate
//!
//! # Delete expired verification and reset tokens
//! rounds-cli tokens purge
//!
//! # Mark an owner account verified
//! rounds-cli user verify -e owner@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rounds-cli")]
#[command(author, version, about = "Rounds CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Maintain email tokens
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Manage owner accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Delete expired verification and password reset tokens
    Purge,
}

#[derive(Subcommand)]
enum UserAction {
    /// Mark an account's email as verified
    Verify {
        /// Owner email address
        #[arg(short, long)]
        email: String,
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tokens {
            action: TokenAction::Purge,
        } => {
            commands::tokens::purge().await?;
        }
        Commands::User {
            action: UserAction::Verify { email },
        } => commands::user::verify(&email).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_user_verify() {
        let cli = Cli::try_parse_from(["rounds-cli", "user", "verify", "-e", "a@b.co"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::User {
                action: UserAction::Verify { .. }
            })
        ));
    }
}

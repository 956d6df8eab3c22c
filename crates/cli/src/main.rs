//! Vitrina CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (schema + session table)
//! vitrina-cli migrate
//!
//! # Grant the admin role to a user
//! vitrina-cli user set-role --phone +79991234567 --role ADMIN
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user set-role` - Change a user's role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{ArgGroup, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrina-cli")]
#[command(author, version, about = "Vitrina CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Change the role of an existing user
    #[command(group(ArgGroup::new("contact").required(true).args(["phone", "email"])))]
    SetRole {
        /// Phone number the user logs in with
        #[arg(short, long)]
        phone: Option<String>,

        /// Email address the user logs in with
        #[arg(short, long)]
        email: Option<String>,

        /// New role (`USER` or `ADMIN`)
        #[arg(short, long, default_value = "ADMIN")]
        role: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::SetRole { phone, email, role } => {
                let contact = commands::user::parse_contact(phone.as_deref(), email.as_deref())?;
                commands::user::set_role(&contact, &role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_set_role_requires_contact() {
        assert!(Cli::try_parse_from(["vitrina-cli", "user", "set-role", "--role", "ADMIN"]).is_err());
        assert!(
            Cli::try_parse_from(["vitrina-cli", "user", "set-role", "--email", "a@b.ru"]).is_ok()
        );
    }
}

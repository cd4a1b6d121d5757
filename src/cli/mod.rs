pub mod commands;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::database::{DatabaseManager, PgStore};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Project tracker administration CLI")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "User management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Role management")]
    Role {
        #[command(subcommand)]
        cmd: commands::role::RoleCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Connect with the configured pool settings. Commands operate on the
/// same database as the server, so `DATABASE_URL` is required.
pub async fn connect() -> anyhow::Result<PgStore> {
    let pool = DatabaseManager::connect(&config::config().database)
        .await
        .context("failed to connect to the database")?;
    Ok(PgStore::new(pool))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
        Commands::Role { cmd } => commands::role::handle(cmd, output_format).await,
    }
}

pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::database;

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Portal TI admin CLI - user bootstrap and telephony imports against the configured store")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "User management")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Import a telephony CSV export for a reference period")]
    Import {
        #[command(subcommand)]
        cmd: commands::import::ImportCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let config = AppConfig::from_env()?;
    let store = database::connect(&config.database).await?;
    let ctx = AppContext::build(config, store.clone());

    let result = match cli.command {
        Commands::Users { cmd } => commands::users::handle(cmd, &ctx, output_format).await,
        Commands::Import { cmd } => commands::import::handle(cmd, &ctx, output_format).await,
    };

    store.close().await;
    result
}

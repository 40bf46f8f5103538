use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::context::AppContext;
use crate::ingest::Dialect;

/// Actor recorded in the audit log for CLI imports.
const CLI_ACTOR: &str = "cli";

#[derive(Subcommand)]
pub enum ImportCommands {
    #[command(about = "Import a Tim carrier export (replaces Tim lines for the period)")]
    Tim {
        #[arg(help = "Path to the comma-separated export")]
        file: PathBuf,
        #[arg(long, help = "Reference period, e.g. 2024-01")]
        period: String,
    },

    #[command(about = "Import the inventory spreadsheet (replaces every carrier for the period)")]
    Inventory {
        #[arg(help = "Path to the semicolon-separated export")]
        file: PathBuf,
        #[arg(long, help = "Reference period, e.g. 2024-01")]
        period: String,
    },
}

pub async fn handle(cmd: ImportCommands, ctx: &AppContext, output_format: OutputFormat) -> anyhow::Result<()> {
    let (dialect, file, period) = match cmd {
        ImportCommands::Tim { file, period } => (Dialect::Carrier, file, period),
        ImportCommands::Inventory { file, period } => (Dialect::Inventory, file, period),
    };

    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|e| anyhow::anyhow!("could not read {}: {}", file.display(), e))?;
    let summary = ctx.importer.import(CLI_ACTOR, dialect, &period, &bytes).await?;

    output_success(
        output_format,
        &format!(
            "Imported {} rows for {} ({} skipped)",
            summary.rows_imported,
            period.trim(),
            summary.rows_skipped
        ),
        Some(serde_json::to_value(&summary)?),
    )
}

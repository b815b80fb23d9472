//! Command execution.

use anyhow::{Context, Result};
use serde_json::{Value, json};

use cairn_core::AppConfig;
use cairn_pipeline::{Orchestrator, PreviewOutcome};

use crate::{Cli, Command};

/// Load configuration, build the orchestrator and run the selected command.
pub async fn run(cli: &Cli) -> Result<Value> {
    let config = AppConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    let orchestrator = Orchestrator::from_config(config)?;
    tracing::debug!(command = ?cli.command, principal = %cli.principal, "running command");
    execute(&orchestrator, &cli.command, &cli.principal).await
}

pub async fn execute(orchestrator: &Orchestrator, command: &Command, principal: &str) -> Result<Value> {
    let value = match command {
        Command::Preview { id } => {
            let source = orchestrator.documents().resolve(id).await?;
            match orchestrator.get_or_build_preview(&source, principal).await? {
                PreviewOutcome::Ready(artifact) => json!({
                    "supported": true,
                    "key": artifact.key,
                    "path": artifact.path,
                    "cached": artifact.cached,
                }),
                PreviewOutcome::Unsupported { extension } => json!({
                    "supported": false,
                    "extension": extension,
                }),
            }
        }
        Command::Import { id } => {
            let source = orchestrator.documents().resolve(id).await?;
            serde_json::to_value(orchestrator.import_table(&source, principal).await?)?
        }
        Command::Sync { id } => serde_json::to_value(orchestrator.sync_table(id, principal).await?)?,
        Command::Schema { id } => {
            let descriptor = orchestrator.get_schema(id).await?;
            json!({
                "source_id": descriptor.source_id,
                "table_name": descriptor.table_name,
                "row_count": descriptor.row_count,
                "columns": descriptor.columns,
            })
        }
        Command::Rows { id, limit } => {
            let rows = orchestrator.get_preview_rows(id, *limit).await?;
            json!({ "source_id": id, "rows": rows })
        }
        Command::Remove { id } => json!({ "removed": orchestrator.remove_table(id).await? }),
        Command::List => json!({ "tables": orchestrator.list_tables().await? }),
        Command::Sweep { days } => json!({ "deleted": orchestrator.sweep_previews(*days).await? }),
    };
    Ok(value)
}

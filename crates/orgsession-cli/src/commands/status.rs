//! Instance status table CLI commands.

use chrono::DateTime;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use orgsession_core::error::AppError;
use orgsession_core::types::{InstanceId, InstanceRecord, InstanceStatus, now_millis};

/// Arguments for status commands
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Status subcommand
    #[command(subcommand)]
    pub command: StatusCommand,
}

/// Status subcommands
#[derive(Debug, Subcommand)]
pub enum StatusCommand {
    /// List every instance's record
    List,
    /// Show one instance's record
    Get {
        /// Instance ID
        id: InstanceId,
    },
    /// Publish a status for an instance
    Set {
        /// Instance ID
        id: InstanceId,
        /// initializing, authenticating, authenticated, failed or idle
        status: InstanceStatus,
    },
    /// Remove one instance's record
    Clear {
        /// Instance ID
        id: InstanceId,
    },
    /// Remove the whole table
    ClearAll {
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Status display row
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Instance ID
    instance: u32,
    /// Status
    status: String,
    /// Last written
    updated: String,
    /// Age in seconds
    age_secs: String,
    /// Past the staleness threshold
    stale: bool,
}

impl StatusRow {
    fn from_record(record: &InstanceRecord, stale_after: std::time::Duration, now: i64) -> Self {
        Self {
            instance: record.instance_id.get(),
            status: record.status.to_string(),
            updated: DateTime::from_timestamp_millis(record.timestamp)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
                .unwrap_or_else(|| record.timestamp.to_string()),
            age_secs: format!("{:.1}", record.age_at(now).as_secs_f64()),
            stale: record.is_stale_at(stale_after, now),
        }
    }
}

/// Execute status commands
pub async fn execute(
    args: &StatusArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let store = super::open_status_store(&config).await?;
    let stale_after = config.coordination.stale_after();

    match &args.command {
        StatusCommand::List => {
            let now = now_millis();
            let rows: Vec<StatusRow> = store
                .get_all_statuses()
                .await
                .values()
                .map(|record| StatusRow::from_record(record, stale_after, now))
                .collect();

            output::print_list(&rows, format);
        }
        StatusCommand::Get { id } => {
            let record = store
                .get_status(*id)
                .await
                .ok_or_else(|| AppError::not_found(format!("No status recorded for instance {id}")))?;

            match format {
                OutputFormat::Json => output::print_item(&record, format),
                OutputFormat::Table => {
                    let row = StatusRow::from_record(&record, stale_after, now_millis());
                    output::print_kv("Instance", &row.instance.to_string());
                    output::print_kv("Status", &row.status);
                    output::print_kv("Updated", &row.updated);
                    output::print_kv("Age (s)", &row.age_secs);
                    output::print_kv("Stale", if row.stale { "yes" } else { "no" });
                }
            }
        }
        StatusCommand::Set { id, status } => {
            store.set_status(*id, *status).await;
            match store.get_status(*id).await {
                Some(record) if record.status == *status => {
                    output::print_success(&format!("Instance {id} is now {status}"));
                }
                _ => {
                    return Err(AppError::storage(format!(
                        "Status for instance {id} could not be written"
                    )));
                }
            }
        }
        StatusCommand::Clear { id } => {
            store.clear_status(*id).await;
            output::print_success(&format!("Status of instance {id} cleared"));
        }
        StatusCommand::ClearAll { force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Remove the whole status table '{}'?", store.key()))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            store.clear_all().await;
            output::print_success("Status table cleared");
        }
    }

    Ok(())
}

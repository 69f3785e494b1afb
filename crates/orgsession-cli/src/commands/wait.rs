//! Parent wait CLI command.

use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::output::{self, OutputFormat};
use orgsession_coord::{ParentWaitProtocol, WaitOptions, WaitOutcome};
use orgsession_core::error::AppError;
use orgsession_core::types::InstanceId;

/// Arguments for the wait command
#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Parent instance ID
    #[arg(long, default_value_t = InstanceId::ROOT)]
    pub parent: InstanceId,

    /// Timeout in milliseconds (defaults to the configured value)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Poll interval in milliseconds (defaults to the configured value)
    #[arg(long)]
    pub poll_ms: Option<u64>,
}

/// Wait result
#[derive(Debug, Serialize)]
struct WaitReport {
    parent: InstanceId,
    outcome: WaitOutcome,
    elapsed_ms: u64,
}

/// Execute the wait command
pub async fn execute(
    args: &WaitArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let store = super::open_status_store(&config).await?;
    let protocol = ParentWaitProtocol::new(store, &config.coordination);

    let options = WaitOptions::from_millis(
        args.timeout_ms.unwrap_or(config.coordination.wait_timeout_ms),
        args.poll_ms.unwrap_or(config.coordination.poll_interval_ms),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let started = tokio::time::Instant::now();
    let outcome = protocol
        .wait_for_parent_until(args.parent, options, &cancel)
        .await;
    let report = WaitReport {
        parent: args.parent,
        outcome,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    match format {
        OutputFormat::Json => output::print_item(&report, format),
        OutputFormat::Table => {
            output::print_kv("Parent", &report.parent.to_string());
            output::print_kv("Outcome", report.outcome.as_str());
            output::print_kv("Elapsed (ms)", &report.elapsed_ms.to_string());
        }
    }

    if outcome.is_ready() {
        Ok(())
    } else {
        Err(AppError::parent_unavailable(format!(
            "Parent instance {} is not ready ({outcome})",
            args.parent
        )))
    }
}

//! CLI command definitions and dispatch.

pub mod config;
pub mod status;
pub mod wait;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::{self, OutputFormat};
use orgsession_coord::InstanceStatusStore;
use orgsession_core::config::AppConfig;
use orgsession_core::error::AppError;
use orgsession_core::traits::SessionStorage;
use orgsession_storage::StorageManager;

/// OrgSession: inspect and drive shared instance status
#[derive(Debug, Parser)]
#[command(name = "orgsession", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Instance status table
    Status(status::StatusArgs),
    /// Wait for a parent instance to become ready
    Wait(wait::WaitArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Status(args) => status::execute(args, &self.config, self.format).await,
            Commands::Wait(args) => wait::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: open the configured storage and the status table on top of it
pub async fn open_status_store(config: &AppConfig) -> Result<InstanceStatusStore, AppError> {
    let manager = StorageManager::new(&config.storage).await?;
    if manager.provider_type() == "memory" {
        output::print_warning(
            "Storage provider is 'memory': the table only lives as long as this command",
        );
    }
    Ok(InstanceStatusStore::from_config(Arc::new(manager), &config.storage))
}

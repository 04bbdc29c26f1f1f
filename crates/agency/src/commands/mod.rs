//! CLI command implementations.

pub(crate) mod audit;
pub(crate) mod init;
pub(crate) mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use agency_config::{CliSettings, Config};
use agency_content::Reconciler;
use clap::Args;

pub(crate) use audit::AuditArgs;
pub(crate) use init::InitArgs;
pub(crate) use serve::ServeArgs;

use crate::error::CliError;

/// Arguments shared by the store maintenance commands.
#[derive(Args)]
pub(crate) struct StoreArgs {
    /// Path to configuration file (default: auto-discover agency.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content store database URL (overrides config).
    #[arg(long, env = "AGENCY_DATABASE_URL")]
    database_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl StoreArgs {
    /// Load config and build a reconciler over the configured store.
    async fn reconciler(self) -> Result<Reconciler, CliError> {
        let cli_settings = CliSettings {
            database_url: self.database_url,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let templates = agency_server::load_templates(config.content.templates_file.as_deref())?;
        let store =
            agency_server::open_store(&config.database.url, config.database.max_connections)
                .await?;
        Ok(Reconciler::new(store, Arc::new(templates)))
    }
}

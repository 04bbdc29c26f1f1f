//! `agency serve` command implementation.

use std::path::PathBuf;

use agency_config::{CliSettings, Config, MissingPage};
use agency_server::{run_server, server_config_from_config};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover agency.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Content store database URL (overrides config).
    #[arg(long, env = "AGENCY_DATABASE_URL")]
    database_url: Option<String>,

    /// Enable verbose output (request and timing logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip seeding template pages on start.
    #[arg(long)]
    no_init: bool,

    /// Enable live content updates (default: enabled).
    #[arg(long)]
    live_updates: Option<bool>,

    /// Disable live content updates.
    #[arg(long, conflicts_with = "live_updates")]
    no_live_updates: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let live_updates_enabled = self.resolve_live_updates_enabled();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            database_url: self.database_url,
            initialize_on_start: self.no_init.then_some(false),
            live_updates_enabled,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!("Database: {}", config.database.url));

        if let Some(templates_file) = &config.content.templates_file {
            output.info(&format!("Templates file: {}", templates_file.display()));
        }

        match config.content.missing_page {
            MissingPage::Materialize => output.info("Missing pages: seeded on first request"),
            MissingPage::Template => output.info("Missing pages: served from templates"),
        }

        if config.live_updates.enabled {
            output.info("Live updates: enabled");
        } else {
            output.info("Live updates: disabled");
        }

        let server_config = server_config_from_config(&config, version.to_owned());
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }

    /// Resolve `live_updates_enabled` from --live-updates/--no-live-updates flags.
    fn resolve_live_updates_enabled(&self) -> Option<bool> {
        self.no_live_updates.then_some(false).or(self.live_updates)
    }
}

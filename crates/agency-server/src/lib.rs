//! HTTP server for the agency content engine.
//!
//! This crate provides a native Rust HTTP server using axum, serving:
//! - Resolved pages as JSON (`/api/pages/...`)
//! - Admin endpoints for editing, initialization, auditing and the activity log
//! - A WebSocket endpoint pushing content changes for one page
//!
//! # Quick Start
//!
//! ```ignore
//! use agency_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         database_url: "sqlite://agency.db".to_owned(),
//!         version: "1.0.0".to_owned(),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (agency-server)
//!                        │
//!                        ├─► /api/pages ──► ContentReader ──► PageCache
//!                        │                        │
//!                        │                        └─► Reconciler ──► ContentStore
//!                        │
//!                        ├─► /api/admin ──► ContentEditor / Reconciler
//!                        │
//!                        └─► /ws/content ──► ChangeNotifier ◄── store change feed
//! ```

mod app;
mod error;
mod handlers;
mod live_updates;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use agency_config::MissingPage;
use agency_content::MissingPagePolicy;
use agency_store::{ContentStore, StoreError};
use agency_store_sqlite::SqliteStore;
use agency_templates::{TemplateError, TemplateLibrary};
use state::AppState;

/// Error preparing the server's dependencies.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The content store could not be opened.
    #[error("Failed to open content store: {0}")]
    Store(#[from] StoreError),

    /// The templates file could not be read.
    #[error("Failed to read templates file {}: {source}", path.display())]
    TemplatesIo {
        /// Templates file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The templates file is malformed or inconsistent.
    #[error("Invalid templates file {}: {source}", path.display())]
    Templates {
        /// Templates file path.
        path: PathBuf,
        /// Parse or validation error.
        source: TemplateError,
    },
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Content store database URL.
    pub database_url: String,
    /// Connection pool size.
    pub max_connections: u32,
    /// Seed every template page before accepting requests.
    pub initialize_on_start: bool,
    /// What to do when a requested page has no row.
    pub missing_page: MissingPagePolicy,
    /// Extra templates merged over the built-in set.
    pub templates_file: Option<PathBuf>,
    /// Serve `/ws/content`.
    pub live_updates_enabled: bool,
    /// Application version (for cache invalidation).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
            database_url: "sqlite://agency.db".to_owned(),
            max_connections: 5,
            initialize_on_start: true,
            missing_page: MissingPagePolicy::default(),
            templates_file: None,
            live_updates_enabled: true,
            version: String::new(),
        }
    }
}

/// Load the built-in templates, merged with `templates_file` if given.
///
/// # Errors
///
/// Returns [`StartupError`] if the file can't be read or parsed.
pub fn load_templates(templates_file: Option<&Path>) -> Result<TemplateLibrary, StartupError> {
    let library = TemplateLibrary::builtin();
    let Some(path) = templates_file else {
        return Ok(library);
    };

    let content = std::fs::read_to_string(path).map_err(|source| StartupError::TemplatesIo {
        path: path.to_path_buf(),
        source,
    })?;
    let extra = TemplateLibrary::from_toml(&content).map_err(|source| StartupError::Templates {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), templates = extra.len(), "Loaded templates file");
    Ok(library.merge(extra))
}

/// Open the `SQLite` content store, creating the schema if needed.
///
/// # Errors
///
/// Returns [`StoreError`] if the database can't be opened.
pub async fn open_store(
    database_url: &str,
    max_connections: u32,
) -> Result<Arc<dyn ContentStore>, StoreError> {
    let store = SqliteStore::connect(database_url, max_connections).await?;
    Ok(Arc::new(store))
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the store or templates can't be loaded, or the server
/// fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let templates = Arc::new(load_templates(config.templates_file.as_deref())?);
    let store = open_store(&config.database_url, config.max_connections)
        .await
        .map_err(StartupError::from)?;

    let state = Arc::new(AppState::new(
        store,
        templates,
        config.missing_page,
        config.live_updates_enabled,
        config.version.clone(),
    ));

    if config.initialize_on_start {
        let start = Instant::now();
        let report = state.reconciler.initialize_all_pages().await;
        tracing::info!(
            success = report.success(),
            failed = report.failed(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Initialized pages on start"
        );
    }

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from the agency config.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `version` - Application version
#[must_use]
pub fn server_config_from_config(config: &agency_config::Config, version: String) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        initialize_on_start: config.content.initialize_on_start,
        missing_page: match config.content.missing_page {
            MissingPage::Materialize => MissingPagePolicy::Materialize,
            MissingPage::Template => MissingPagePolicy::TemplateFallback,
        },
        templates_file: config.content.templates_file.clone(),
        live_updates_enabled: config.live_updates.enabled,
        version,
    }
}

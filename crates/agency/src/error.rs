//! CLI error types.

use agency_config::ConfigError;
use agency_server::StartupError;
use agency_store::StoreError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Startup(#[from] StartupError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Server(String),

    /// Batch initialization left some pages failed.
    #[error("{failed} page(s) failed to initialize")]
    Incomplete { failed: usize },
}

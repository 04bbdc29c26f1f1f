//! Agency CLI - content engine for the agency website.
//!
//! Provides commands for:
//! - `serve`: Start the content server
//! - `init`: Seed every template page into the content store
//! - `audit`: Report template pages and sections missing from the store

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AuditArgs, InitArgs, ServeArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Agency - content engine.
#[derive(Parser)]
#[command(name = "agency", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the content server.
    Serve(ServeArgs),
    /// Seed missing pages and sections from templates.
    Init(InitArgs),
    /// List template pages and sections missing from the store.
    Audit(AuditArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Serve(args) => args.verbose,
            Self::Init(args) => args.common.verbose,
            Self::Audit(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = run(cli.command);

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    match command {
        Commands::Serve(args) => rt.block_on(args.execute(VERSION)),
        Commands::Init(args) => rt.block_on(args.execute()),
        Commands::Audit(args) => rt.block_on(args.execute()),
    }
}

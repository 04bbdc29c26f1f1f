//! `agency init` command implementation.

use std::time::Instant;

use clap::Args;

use super::StoreArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the init command.
#[derive(Args)]
pub(crate) struct InitArgs {
    #[command(flatten)]
    pub common: StoreArgs,
}

impl InitArgs {
    /// Execute the init command.
    ///
    /// # Errors
    ///
    /// Returns an error if the store can't be opened or any page fails to
    /// initialize.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let reconciler = self.common.reconciler().await?;

        let start = Instant::now();
        let report = reconciler.initialize_all_pages().await;
        let elapsed = start.elapsed();

        for failure in &report.failures {
            output.item(&format!("{}: {}", failure.path, failure.error));
        }

        let summary = format!(
            "Initialized {} page(s), {} failed ({:.1}s)",
            report.success(),
            report.failed(),
            elapsed.as_secs_f64()
        );
        if report.failed() == 0 {
            output.success(&summary);
            Ok(())
        } else {
            output.warning(&summary);
            Err(CliError::Incomplete {
                failed: report.failed(),
            })
        }
    }
}

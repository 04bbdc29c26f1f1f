//! `agency audit` command implementation.

use clap::Args;

use super::StoreArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the audit command.
#[derive(Args)]
pub(crate) struct AuditArgs {
    #[command(flatten)]
    pub common: StoreArgs,
}

impl AuditArgs {
    /// Execute the audit command.
    ///
    /// Reports gaps only; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store can't be read.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let reconciler = self.common.reconciler().await?;

        let missing_pages = reconciler.missing_pages().await?;
        let missing_sections = reconciler.pages_with_missing_sections().await?;

        if missing_pages.is_empty() && missing_sections.is_empty() {
            output.success("All template pages and sections are present");
            return Ok(());
        }

        if !missing_pages.is_empty() {
            output.heading(&format!("Missing pages ({})", missing_pages.len()));
            for path in &missing_pages {
                output.item(path);
            }
        }

        if !missing_sections.is_empty() {
            output.heading(&format!(
                "Pages with missing sections ({})",
                missing_sections.len()
            ));
            for entry in &missing_sections {
                output.item(&format!(
                    "{}: {}",
                    entry.page_path,
                    entry.missing_keys.join(", ")
                ));
            }
        }

        output.warning("Run `agency init` to seed the missing content");
        Ok(())
    }
}

//! Template-driven initialization of stored page content.
//!
//! Seeding is additive: a missing page row is created from its template and
//! missing sections are backfilled, but an existing row is never written to.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use agency_store::{
    ActivityAction, ContentStore, NewActivity, PageRecord, SectionFilter, SectionRecord, StoreError,
};
use agency_templates::TemplateLibrary;
use serde::Serialize;

use crate::record_activity;

/// Error returned when initialization of a single page aborts.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Checking existing rows failed.
    #[error("Failed to read content for {path}: {source}")]
    Read { path: String, source: StoreError },

    /// Creating a row failed for a reason other than a duplicate key.
    #[error("Failed to seed content for {path}: {source}")]
    Write { path: String, source: StoreError },
}

impl ReconcileError {
    /// Page path the failure belongs to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Read { path, .. } | Self::Write { path, .. } => path,
        }
    }

    /// Underlying store error.
    #[must_use]
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => source,
        }
    }
}

/// Result of [`Reconciler::ensure_initialized`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    /// The path has no template; nothing was read or written.
    NoTemplate,
    /// The page now has at least its template baseline.
    ///
    /// Both counts are zero when everything was already present.
    Seeded {
        page_created: bool,
        sections_created: usize,
    },
}

impl InitOutcome {
    /// Whether the page is known to be initialized.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Seeded { .. })
    }

    /// Whether this run created any rows.
    #[must_use]
    pub fn created_anything(self) -> bool {
        match self {
            Self::NoTemplate => false,
            Self::Seeded {
                page_created,
                sections_created,
            } => page_created || sections_created > 0,
        }
    }
}

/// A path that failed during [`Reconciler::initialize_all_pages`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of a best-effort batch initialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Paths that are initialized after the run.
    pub initialized: Vec<String>,
    /// Paths whose initialization aborted.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    #[must_use]
    pub fn success(&self) -> usize {
        self.initialized.len()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// A stored page that lacks one or more template sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingSections {
    pub page_path: String,
    pub missing_keys: Vec<String>,
}

/// Seeds the content store from the template library.
///
/// Cheap to clone; the store and library are shared.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ContentStore>,
    templates: Arc<TemplateLibrary>,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, templates: Arc<TemplateLibrary>) -> Self {
        Self { store, templates }
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Make sure `path` has at least its template baseline in the store.
    ///
    /// A missing page row is created from the template and marked published.
    /// Template sections whose key has no row are inserted; a soft-deleted
    /// row counts as present. Rows that already exist are never modified. A
    /// duplicate-key rejection from the store means a concurrent caller won
    /// the race and counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if a store read fails or an insert is
    /// rejected for any reason other than a duplicate key. Rows created
    /// before the failure are kept.
    pub async fn ensure_initialized(&self, path: &str) -> Result<InitOutcome, ReconcileError> {
        let Some(template) = self.templates.get(path) else {
            tracing::debug!(path, "No template, skipping initialization");
            return Ok(InitOutcome::NoTemplate);
        };
        let start = Instant::now();

        let existing = self
            .store
            .page(path)
            .await
            .map_err(|source| read_error(path, source))?;

        let page_created = if existing.is_some() {
            false
        } else {
            let result = self
                .store
                .insert_page(PageRecord::from_template(template))
                .await;
            let created = created(path, result)?;
            if created {
                record_activity(
                    self.store.as_ref(),
                    NewActivity::page(ActivityAction::SeededPage, path),
                )
                .await;
            }
            created
        };

        let present: HashSet<String> = self
            .store
            .sections(path, SectionFilter::All)
            .await
            .map_err(|source| read_error(path, source))?
            .into_iter()
            .map(|section| section.section_key)
            .collect();

        let mut sections_created = 0;
        for section in &template.sections {
            if present.contains(&section.section_key) {
                continue;
            }
            let result = self
                .store
                .insert_section(SectionRecord::from_template(path, section))
                .await;
            if created(path, result)? {
                sections_created += 1;
                record_activity(
                    self.store.as_ref(),
                    NewActivity::section(ActivityAction::SeededSection, path, &section.section_key),
                )
                .await;
            }
        }

        let outcome = InitOutcome::Seeded {
            page_created,
            sections_created,
        };
        if outcome.created_anything() {
            tracing::info!(
                path,
                page_created,
                sections_created,
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Initialized page content"
            );
        } else {
            tracing::debug!(path, "Page content already initialized");
        }
        Ok(outcome)
    }

    /// Run [`ensure_initialized`](Self::ensure_initialized) for every template.
    ///
    /// Pages are independent: a failure is recorded and the batch moves on.
    pub async fn initialize_all_pages(&self) -> BatchReport {
        let start = Instant::now();
        let mut report = BatchReport::default();

        for path in self.templates.paths() {
            match self.ensure_initialized(path).await {
                Ok(_) => report.initialized.push(path.to_owned()),
                Err(e) => {
                    tracing::warn!(path, error = %e, "Page initialization failed");
                    report.failures.push(BatchFailure {
                        path: path.to_owned(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            success = report.success(),
            failed = report.failed(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Initialized all pages"
        );
        report
    }

    /// Template paths that have no page row at all.
    ///
    /// # Errors
    ///
    /// Returns the store error if listing pages fails.
    pub async fn missing_pages(&self) -> Result<Vec<String>, StoreError> {
        let stored = self.stored_paths().await?;
        Ok(self
            .templates
            .paths()
            .filter(|path| !stored.contains(*path))
            .map(str::to_owned)
            .collect())
    }

    /// Stored pages missing one or more template section keys.
    ///
    /// Inactive rows count as present: a soft-deleted section is an editor
    /// decision, not a gap.
    ///
    /// # Errors
    ///
    /// Returns the store error if any read fails.
    pub async fn pages_with_missing_sections(&self) -> Result<Vec<MissingSections>, StoreError> {
        let stored = self.stored_paths().await?;
        let mut report = Vec::new();

        for template in self.templates.iter() {
            if !stored.contains(&template.path) {
                continue;
            }
            let keys: HashSet<String> = self
                .store
                .sections(&template.path, SectionFilter::All)
                .await?
                .into_iter()
                .map(|section| section.section_key)
                .collect();
            let missing_keys: Vec<String> = template
                .section_keys()
                .filter(|key| !keys.contains(*key))
                .map(str::to_owned)
                .collect();
            if !missing_keys.is_empty() {
                report.push(MissingSections {
                    page_path: template.path.clone(),
                    missing_keys,
                });
            }
        }

        Ok(report)
    }

    async fn stored_paths(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .store
            .pages()
            .await?
            .into_iter()
            .map(|page| page.page_path)
            .collect())
    }
}

fn read_error(path: &str, source: StoreError) -> ReconcileError {
    ReconcileError::Read {
        path: path.to_owned(),
        source,
    }
}

/// Map an insert result to "did this call create the row".
fn created<T>(path: &str, result: Result<T, StoreError>) -> Result<bool, ReconcileError> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_unique_violation() => {
            tracing::debug!(path, "Row already created by a concurrent initializer");
            Ok(false)
        }
        Err(source) => Err(ReconcileError::Write {
            path: path.to_owned(),
            source,
        }),
    }
}

//! Content store trait and error types.
//!
//! Provides the core [`ContentStore`] trait for reading and writing page and
//! section rows, along with [`StoreError`] for unified error handling across
//! backends.
//!
//! # Page Path Convention
//!
//! All `path` parameters are route paths with a leading slash:
//! - `"/"` - home page
//! - `"/about"` - top-level page
//! - `"/blog/launch-notes"` - nested page (usually without a template)

use async_trait::async_trait;

use crate::event::{StoreEventReceiver, WatchHandle};
use crate::record::{
    ActivityEntry, NewActivity, PagePatch, PageRecord, SectionFilter, SectionPatch, SectionRecord,
};

/// Semantic error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// Row does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Row already exists (unique constraint rejected an insert).
    AlreadyExists,
    /// Payload or stored data is malformed.
    InvalidData,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (constraint violation, not found, bad payload).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (service unavailable).
    Persistent,
}

/// Store error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StoreError {
    /// Semantic error category.
    pub kind: StoreErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Page path context (if applicable).
    pub path: Option<String>,
    /// Backend identifier (e.g., "Sqlite", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create a new store error.
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach page path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach a plain message as the error source.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message: String = message.into();
        self.source = Some(message.into());
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error with path.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound).with_path(path)
    }

    /// Create a unique-constraint error with path.
    #[must_use]
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::AlreadyExists).with_path(path)
    }

    /// True if a unique constraint rejected the write.
    ///
    /// Under concurrent first loads this means another writer already
    /// created the row.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.kind == StoreErrorKind::AlreadyExists
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: /about)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StoreErrorKind::NotFound => "Not found",
            StoreErrorKind::PermissionDenied => "Permission denied",
            StoreErrorKind::AlreadyExists => "Already exists",
            StoreErrorKind::InvalidData => "Invalid data",
            StoreErrorKind::Unavailable => "Unavailable",
            StoreErrorKind::Timeout => "Timeout",
            StoreErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {path})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Access contract for the persistent content store.
///
/// Two tables back the contract: page content keyed by `page_path`, and page
/// sections keyed by `(page_path, section_key)`. Implementations must enforce
/// both keys as unique constraints and report a rejected insert as
/// [`StoreErrorKind::AlreadyExists`].
///
/// Writes never touch rows other than the one addressed. Nothing in the
/// contract deletes rows; sections are hidden with `is_active = false`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Point lookup of a page row.
    ///
    /// Returns `Ok(None)` when no row exists for the path.
    async fn page(&self, path: &str) -> Result<Option<PageRecord>, StoreError>;

    /// All page rows.
    async fn pages(&self) -> Result<Vec<PageRecord>, StoreError>;

    /// Section rows for a page, in insertion order.
    async fn sections(
        &self,
        path: &str,
        filter: SectionFilter,
    ) -> Result<Vec<SectionRecord>, StoreError>;

    /// Insert a page row and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::AlreadyExists`] if a row for the path exists.
    async fn insert_page(&self, page: PageRecord) -> Result<PageRecord, StoreError>;

    /// Insert a section row and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::AlreadyExists`] if a row with the same
    /// `(page_path, section_key)` exists, active or not.
    async fn insert_section(&self, section: SectionRecord) -> Result<SectionRecord, StoreError>;

    /// Apply a patch to a page row and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::NotFound`] if no row exists for the path.
    async fn update_page(&self, path: &str, patch: &PagePatch) -> Result<PageRecord, StoreError>;

    /// Apply a patch to a section row and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::NotFound`] if the section row doesn't exist.
    async fn update_section(
        &self,
        path: &str,
        section_key: &str,
        patch: &SectionPatch,
    ) -> Result<SectionRecord, StoreError>;

    /// Append an entry to the activity log.
    async fn record_activity(&self, entry: NewActivity) -> Result<ActivityEntry, StoreError>;

    /// Most recent activity entries, newest first.
    async fn activities(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError>;

    /// Start watching page and section rows for a path.
    ///
    /// Returns a receiver for change events and a handle that releases the
    /// feed when dropped. Delivery is best effort: events arrive after the
    /// write commits and may repeat.
    /// Default implementation returns a no-op receiver for backends
    /// that don't support change notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if watching cannot be started.
    fn watch(&self, path: &str) -> Result<(StoreEventReceiver, WatchHandle), StoreError> {
        let _ = path;
        Ok((StoreEventReceiver::no_op(), WatchHandle::no_op()))
    }
}

//! Store event types for change notification.
//!
//! Provides types for subscribing to row changes through the
//! [`ContentStore::watch`](crate::ContentStore::watch) method.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

/// Table touched by a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Page rows.
    PageContent,
    /// Section rows.
    PageSections,
}

impl Table {
    /// Table name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageContent => "page_content",
            Self::PageSections => "page_sections",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of store event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreEventKind {
    /// Row was inserted.
    Inserted,
    /// Row was updated.
    Updated,
    /// Row was deleted.
    Deleted,
}

/// A committed row change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreEvent {
    /// Table the row belongs to.
    pub table: Table,
    /// Page path of the row.
    pub page_path: String,
    /// Kind of change.
    pub kind: StoreEventKind,
}

impl StoreEvent {
    #[must_use]
    pub fn new(table: Table, page_path: impl Into<String>, kind: StoreEventKind) -> Self {
        Self {
            table,
            page_path: page_path.into(),
            kind,
        }
    }
}

/// Receiver for store events.
///
/// Wraps a tokio unbounded channel receiver. Poll with
/// [`recv()`](Self::recv) or [`try_recv()`](Self::try_recv).
#[derive(Debug)]
pub struct StoreEventReceiver {
    rx: mpsc::UnboundedReceiver<StoreEvent>,
}

impl StoreEventReceiver {
    /// Create a new receiver from a channel receiver.
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<StoreEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` when the feed is closed.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.rx.recv().await
    }

    /// Try to receive an event without waiting.
    ///
    /// Returns `None` if no event is available or the feed is closed.
    pub fn try_recv(&mut self) -> Option<StoreEvent> {
        self.rx.try_recv().ok()
    }

    /// Create a receiver that never yields events.
    ///
    /// Used by the default `ContentStore::watch()` implementation for backends
    /// that don't support change notification.
    pub(crate) fn no_op() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self { rx }
    }
}

/// Handle to stop watching for changes.
///
/// Uses RAII pattern - dropping the handle unregisters the watcher from the
/// store's feed.
pub struct WatchHandle {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    /// Create a handle that runs `release` when dropped.
    pub(crate) fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Stop watching immediately (consumes the handle).
    pub fn stop(self) {
        drop(self);
    }

    /// Create a no-op handle that does nothing on drop.
    pub(crate) fn no_op() -> Self {
        Self { release: None }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.release.is_some())
            .finish()
    }
}

//! Template reconciliation and live page content for the agency site.
//!
//! This crate provides:
//! - [`Reconciler`]: seeds the content store from the template library
//!   without ever overwriting an existing row
//! - [`ChangeNotifier`]: per-path change subscriptions fed by the store and by
//!   local edits
//! - [`ContentReader`]: resolves a page path to renderable content, caching
//!   per path until a change notification arrives
//! - [`ContentEditor`]: the editor write path (write, evict, announce, log)
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use agency_content::{ChangeNotifier, ContentReader, Reconciler};
//! use agency_templates::TemplateLibrary;
//!
//! let templates = Arc::new(TemplateLibrary::builtin());
//! let report = Reconciler::new(Arc::clone(&store), Arc::clone(&templates))
//!     .initialize_all_pages()
//!     .await;
//! println!("{} initialized, {} failed", report.success(), report.failed());
//!
//! let reader = ContentReader::new(Arc::clone(&store), templates, ChangeNotifier::new(store));
//! if let Some(page) = reader.resolve("/about").await {
//!     println!("{}: {} sections", page.title, page.sections.len());
//! }
//! ```

mod editor;
mod notifier;
mod page_cache;
mod reader;
mod reconciler;

use agency_store::{ContentStore, NewActivity};

pub use editor::ContentEditor;
pub use notifier::{ChangeNotifier, ChangeOrigin, ContentChange, Subscription};
pub use page_cache::PageCache;
pub use reader::{
    ContentReader, ContentSource, LivePage, MissingPagePolicy, ResolvedPage, ResolvedSection,
};
pub use reconciler::{
    BatchFailure, BatchReport, InitOutcome, MissingSections, ReconcileError, Reconciler,
};

/// Append to the activity log. A failure is logged and otherwise ignored.
pub(crate) async fn record_activity(store: &dyn ContentStore, entry: NewActivity) {
    let action = entry.action;
    let path = entry.page_path.clone();
    if let Err(e) = store.record_activity(entry).await {
        tracing::warn!(path, %action, error = %e, "Failed to record activity");
    }
}

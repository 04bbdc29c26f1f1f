//! Content store contract for the agency content engine.
//!
//! This crate provides a [`ContentStore`] trait abstracting the persistent
//! page-content and page-sections tables. This enables:
//!
//! - **Unit testing** of reconciliation and sync without a database
//! - **Backend flexibility** (`SQLite` today, a hosted Postgres later)
//! - **Clean separation** between content logic and I/O
//!
//! # Architecture
//!
//! The crate provides:
//! - [`ContentStore`] trait with point lookups, filtered scans, inserts,
//!   patches, an activity log and a per-path change feed (`watch()`)
//! - [`StoreError`] with a semantic [`StoreErrorKind`]; a rejected unique key
//!   is always [`StoreErrorKind::AlreadyExists`]
//! - [`ChangeFeed`], the in-process fan-out backends publish committed writes to
//! - [`MockStore`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use agency_store::{ContentStore, SectionFilter};
//!
//! if let Some(page) = store.page("/about").await? {
//!     let sections = store.sections(&page.page_path, SectionFilter::Active).await?;
//!     println!("{}: {} sections", page.title, sections.len());
//! }
//! ```

mod event;
mod feed;
#[cfg(feature = "mock")]
mod mock;
mod record;
mod store;

pub use event::{StoreEvent, StoreEventKind, StoreEventReceiver, Table, WatchHandle};
pub use feed::ChangeFeed;
#[cfg(feature = "mock")]
pub use mock::MockStore;
pub use record::{
    ActivityAction, ActivityEntry, NewActivity, PagePatch, PageRecord, SectionFilter, SectionPatch,
    SectionRecord,
};
pub use store::{ContentStore, ErrorStatus, StoreError, StoreErrorKind};

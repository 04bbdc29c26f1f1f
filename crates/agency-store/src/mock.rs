//! Mock store implementation for testing.
//!
//! Provides [`MockStore`] for unit testing without a database.

use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::event::{StoreEvent, StoreEventKind, StoreEventReceiver, Table, WatchHandle};
use crate::feed::ChangeFeed;
use crate::record::{
    ActivityEntry, NewActivity, PagePatch, PageRecord, SectionFilter, SectionPatch, SectionRecord,
};
use crate::store::{ContentStore, ErrorStatus, StoreError, StoreErrorKind};

/// Mock store for testing.
///
/// Keeps rows in memory and enforces the same unique keys as a real backend.
/// Every operation yields to the scheduler once before touching state, so
/// concurrent callers interleave the way they would against a remote store.
///
/// # Example
///
/// ```ignore
/// use agency_store::{ContentStore, MockStore, PageRecord};
///
/// let store = MockStore::new()
///     .with_page(page)
///     .fail_writes_for("/broken");
///
/// let page = store.page("/about").await?;
/// assert_eq!(store.writes(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    pages: RwLock<Vec<PageRecord>>,
    sections: RwLock<Vec<SectionRecord>>,
    activities: RwLock<Vec<ActivityEntry>>,
    fail_reads: RwLock<HashSet<String>>,
    fail_writes: RwLock<HashSet<String>>,
    unavailable: RwLock<bool>,
    writes: AtomicUsize,
    feed: ChangeFeed,
}

impl MockStore {
    /// Create a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page row without counting it as a write.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, page: PageRecord) -> Self {
        self.pages.write().unwrap().push(page);
        self
    }

    /// Add a section row without counting it as a write.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_section(self, section: SectionRecord) -> Self {
        self.sections.write().unwrap().push(section);
        self
    }

    /// Make reads for a page path fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn fail_reads_for(self, path: impl Into<String>) -> Self {
        self.fail_reads.write().unwrap().insert(path.into());
        self
    }

    /// Make writes for a page path fail with a non-uniqueness error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn fail_writes_for(self, path: impl Into<String>) -> Self {
        self.fail_writes.write().unwrap().insert(path.into());
        self
    }

    /// Make every operation fail as if the backend were down.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    /// Number of successful writes (inserts and updates) so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of page rows for a path (at most one unless the store is broken).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page_rows(&self, path: &str) -> usize {
        self.pages
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.page_path == path)
            .count()
    }

    /// Number of section rows for a path, active or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn section_rows(&self, path: &str) -> usize {
        self.sections
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.page_path == path)
            .count()
    }

    /// Number of live change-feed watchers for a path.
    #[must_use]
    pub fn watcher_count(&self, path: &str) -> usize {
        self.feed.watcher_count(path)
    }

    /// Emit a change event as if another session had written the row.
    pub fn emit(&self, event: &StoreEvent) {
        self.feed.publish(event);
    }

    fn injected(kind: StoreErrorKind, path: &str) -> StoreError {
        StoreError::new(kind)
            .with_status(ErrorStatus::Temporary)
            .with_backend("Mock")
            .with_path(path)
            .with_message("injected failure")
    }

    async fn check_read(&self, path: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        if *self.unavailable.read().unwrap() || self.fail_reads.read().unwrap().contains(path) {
            return Err(Self::injected(StoreErrorKind::Unavailable, path));
        }
        Ok(())
    }

    async fn check_write(&self, path: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        if *self.unavailable.read().unwrap() {
            return Err(Self::injected(StoreErrorKind::Unavailable, path));
        }
        if self.fail_writes.read().unwrap().contains(path) {
            return Err(Self::injected(StoreErrorKind::PermissionDenied, path));
        }
        Ok(())
    }

    fn committed(&self, table: Table, path: &str, kind: StoreEventKind) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.feed.publish(&StoreEvent::new(table, path, kind));
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn page(&self, path: &str) -> Result<Option<PageRecord>, StoreError> {
        self.check_read(path).await?;
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .find(|p| p.page_path == path)
            .cloned())
    }

    async fn pages(&self) -> Result<Vec<PageRecord>, StoreError> {
        self.check_read("").await?;
        Ok(self.pages.read().unwrap().clone())
    }

    async fn sections(
        &self,
        path: &str,
        filter: SectionFilter,
    ) -> Result<Vec<SectionRecord>, StoreError> {
        self.check_read(path).await?;
        Ok(self
            .sections
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.page_path == path && filter.matches(s))
            .cloned()
            .collect())
    }

    async fn insert_page(&self, page: PageRecord) -> Result<PageRecord, StoreError> {
        self.check_write(&page.page_path).await?;
        {
            let mut pages = self.pages.write().unwrap();
            if pages.iter().any(|p| p.page_path == page.page_path) {
                return Err(StoreError::already_exists(&page.page_path).with_backend("Mock"));
            }
            pages.push(page.clone());
        }
        self.committed(Table::PageContent, &page.page_path, StoreEventKind::Inserted);
        Ok(page)
    }

    async fn insert_section(&self, section: SectionRecord) -> Result<SectionRecord, StoreError> {
        self.check_write(&section.page_path).await?;
        {
            let mut sections = self.sections.write().unwrap();
            if sections
                .iter()
                .any(|s| s.page_path == section.page_path && s.section_key == section.section_key)
            {
                return Err(StoreError::already_exists(&section.page_path).with_backend("Mock"));
            }
            sections.push(section.clone());
        }
        self.committed(Table::PageSections, &section.page_path, StoreEventKind::Inserted);
        Ok(section)
    }

    async fn update_page(&self, path: &str, patch: &PagePatch) -> Result<PageRecord, StoreError> {
        self.check_write(path).await?;
        let updated = {
            let mut pages = self.pages.write().unwrap();
            let page = pages
                .iter_mut()
                .find(|p| p.page_path == path)
                .ok_or_else(|| StoreError::not_found(path).with_backend("Mock"))?;
            patch.apply(page);
            page.clone()
        };
        self.committed(Table::PageContent, path, StoreEventKind::Updated);
        Ok(updated)
    }

    async fn update_section(
        &self,
        path: &str,
        section_key: &str,
        patch: &SectionPatch,
    ) -> Result<SectionRecord, StoreError> {
        self.check_write(path).await?;
        let updated = {
            let mut sections = self.sections.write().unwrap();
            let section = sections
                .iter_mut()
                .find(|s| s.page_path == path && s.section_key == section_key)
                .ok_or_else(|| StoreError::not_found(path).with_backend("Mock"))?;
            patch.apply(section);
            section.clone()
        };
        self.committed(Table::PageSections, path, StoreEventKind::Updated);
        Ok(updated)
    }

    async fn record_activity(&self, entry: NewActivity) -> Result<ActivityEntry, StoreError> {
        self.check_write(&entry.page_path).await?;
        let mut activities = self.activities.write().unwrap();
        let stored = ActivityEntry {
            id: i64::try_from(activities.len()).unwrap_or(i64::MAX) + 1,
            action: entry.action,
            page_path: entry.page_path,
            section_key: entry.section_key,
            detail: entry.detail,
            recorded_at: Utc::now(),
        };
        activities.push(stored.clone());
        Ok(stored)
    }

    async fn activities(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError> {
        self.check_read("").await?;
        Ok(self
            .activities
            .read()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn watch(&self, path: &str) -> Result<(StoreEventReceiver, WatchHandle), StoreError> {
        if *self.unavailable.read().unwrap() {
            return Err(Self::injected(StoreErrorKind::Unavailable, path));
        }
        Ok(self.feed.watch(path))
    }
}

#[cfg(test)]
mod tests {
    use agency_templates::{PageTemplate, SectionTemplate, SectionType};
    use pretty_assertions::assert_eq;

    use super::*;

    fn page(path: &str) -> PageRecord {
        PageRecord::from_template(&PageTemplate::new(path, "Title"))
    }

    fn section(path: &str, key: &str) -> SectionRecord {
        SectionRecord::from_template(path, &SectionTemplate::new(key, SectionType::Text, 0))
    }

    #[test]
    fn test_mock_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockStore>();
    }

    #[tokio::test]
    async fn test_new_empty() {
        let store = MockStore::new();

        assert!(store.pages().await.unwrap().is_empty());
        assert!(store.page("/").await.unwrap().is_none());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_insert_page_rejects_duplicate() {
        let store = MockStore::new();
        store.insert_page(page("/about")).await.unwrap();

        let err = store.insert_page(page("/about")).await.unwrap_err();

        assert!(err.is_unique_violation());
        assert_eq!(store.page_rows("/about"), 1);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_insert_section_rejects_inactive_duplicate() {
        let mut hidden = section("/about", "hero");
        hidden.is_active = false;
        let store = MockStore::new().with_section(hidden);

        let err = store.insert_section(section("/about", "hero")).await.unwrap_err();

        assert_eq!(err.kind, StoreErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_sections_filter() {
        let mut hidden = section("/about", "team");
        hidden.is_active = false;
        let store = MockStore::new()
            .with_section(section("/about", "hero"))
            .with_section(hidden)
            .with_section(section("/faq", "hero"));

        let active = store.sections("/about", SectionFilter::Active).await.unwrap();
        let all = store.sections("/about", SectionFilter::All).await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_page() {
        let store = MockStore::new();

        let err = store
            .update_page("/about", &PagePatch::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(err.path.as_deref(), Some("/about"));
    }

    #[tokio::test]
    async fn test_update_section_applies_patch() {
        let store = MockStore::new().with_section(section("/about", "hero"));

        let updated = store
            .update_section("/about", "hero", &SectionPatch::active(false))
            .await
            .unwrap();

        assert!(!updated.is_active);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_fail_writes_for_path() {
        let store = MockStore::new().fail_writes_for("/x");

        let err = store.insert_page(page("/x")).await.unwrap_err();
        store.insert_page(page("/y")).await.unwrap();

        assert_eq!(err.kind, StoreErrorKind::PermissionDenied);
        assert!(!err.is_unique_violation());
        assert_eq!(err.backend, Some("Mock"));
    }

    #[tokio::test]
    async fn test_fail_reads_for_path() {
        let store = MockStore::new().fail_reads_for("/x");

        assert!(store.page("/x").await.is_err());
        assert!(store.page("/y").await.is_ok());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MockStore::new();
        store.set_unavailable(true);

        assert!(store.pages().await.is_err());
        assert!(store.watch("/").is_err());

        store.set_unavailable(false);
        assert!(store.pages().await.is_ok());
    }

    #[tokio::test]
    async fn test_watch_receives_own_writes() {
        let store = MockStore::new();
        let (mut rx, _handle) = store.watch("/about").unwrap();

        store.insert_page(page("/about")).await.unwrap();
        store.insert_section(section("/about", "hero")).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.table, Table::PageContent);
        assert_eq!(first.kind, StoreEventKind::Inserted);
        assert_eq!(second.table, Table::PageSections);
    }

    #[tokio::test]
    async fn test_watch_release_on_drop() {
        let store = MockStore::new();
        let (_rx, handle) = store.watch("/about").unwrap();
        assert_eq!(store.watcher_count("/about"), 1);

        drop(handle);

        assert_eq!(store.watcher_count("/about"), 0);
    }

    #[tokio::test]
    async fn test_activities_newest_first() {
        use crate::record::ActivityAction;

        let store = MockStore::new();
        store
            .record_activity(NewActivity::page(ActivityAction::SeededPage, "/"))
            .await
            .unwrap();
        store
            .record_activity(NewActivity::page(ActivityAction::UpdatedPage, "/"))
            .await
            .unwrap();

        let entries = store.activities(10).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, ActivityAction::UpdatedPage);
        assert_eq!(entries[0].id, 2);
        assert_eq!(store.activities(1).await.unwrap().len(), 1);
    }
}

//! Editor write path.
//!
//! Every successful edit evicts the cached page, is announced locally right
//! away and is recorded in the activity log.

use std::sync::Arc;

use agency_store::{
    ActivityAction, ContentStore, NewActivity, PagePatch, PageRecord, SectionPatch, SectionRecord,
    StoreError, StoreErrorKind,
};

use crate::reader::ContentReader;
use crate::record_activity;

/// Applies editor changes to stored content.
#[derive(Clone)]
pub struct ContentEditor {
    store: Arc<dyn ContentStore>,
    reader: ContentReader,
}

impl ContentEditor {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, reader: ContentReader) -> Self {
        Self { store, reader }
    }

    /// Update page metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::InvalidData`] for an empty patch,
    /// [`StoreErrorKind::NotFound`] if the page has no row, or the store's
    /// write error.
    pub async fn update_page(
        &self,
        path: &str,
        patch: &PagePatch,
    ) -> Result<PageRecord, StoreError> {
        if patch.is_empty() {
            return Err(empty_patch(path));
        }
        let page = self.store.update_page(path, patch).await?;
        self.changed(NewActivity::page(ActivityAction::UpdatedPage, path)).await;
        Ok(page)
    }

    /// Update one section.
    ///
    /// # Errors
    ///
    /// Same as [`update_page`](Self::update_page).
    pub async fn update_section(
        &self,
        path: &str,
        section_key: &str,
        patch: &SectionPatch,
    ) -> Result<SectionRecord, StoreError> {
        if patch.is_empty() {
            return Err(empty_patch(path));
        }
        let action = match patch.is_active {
            Some(false) => ActivityAction::DeactivatedSection,
            Some(true) if is_only_activation(patch) => ActivityAction::RestoredSection,
            _ => ActivityAction::UpdatedSection,
        };
        self.write_section(path, section_key, patch, action).await
    }

    /// Hide a section without removing its row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::NotFound`] if the section has no row, or the
    /// store's write error.
    pub async fn deactivate_section(
        &self,
        path: &str,
        section_key: &str,
    ) -> Result<SectionRecord, StoreError> {
        self.write_section(
            path,
            section_key,
            &SectionPatch::active(false),
            ActivityAction::DeactivatedSection,
        )
        .await
    }

    /// Show a previously hidden section again.
    ///
    /// # Errors
    ///
    /// Same as [`deactivate_section`](Self::deactivate_section).
    pub async fn restore_section(
        &self,
        path: &str,
        section_key: &str,
    ) -> Result<SectionRecord, StoreError> {
        self.write_section(
            path,
            section_key,
            &SectionPatch::active(true),
            ActivityAction::RestoredSection,
        )
        .await
    }

    async fn write_section(
        &self,
        path: &str,
        section_key: &str,
        patch: &SectionPatch,
        action: ActivityAction,
    ) -> Result<SectionRecord, StoreError> {
        let section = self.store.update_section(path, section_key, patch).await?;
        self.changed(NewActivity::section(action, path, section_key)).await;
        Ok(section)
    }

    async fn changed(&self, activity: NewActivity) {
        let path = activity.page_path.clone();
        self.reader.invalidate(&path);
        let reached = self.reader.notifier().notify_local(&path);
        tracing::info!(
            path,
            section_key = activity.section_key.as_deref(),
            action = %activity.action,
            subscribers = reached,
            "Content edited"
        );
        record_activity(self.store.as_ref(), activity).await;
    }
}

fn is_only_activation(patch: &SectionPatch) -> bool {
    let mut rest = patch.clone();
    rest.is_active = None;
    rest.is_empty()
}

fn empty_patch(path: &str) -> StoreError {
    StoreError::new(StoreErrorKind::InvalidData)
        .with_path(path)
        .with_message("patch contains no fields")
}

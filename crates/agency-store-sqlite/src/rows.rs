//! Row mapping between `SQLite` and store records.
//!
//! Stored text that fails to parse (section type, metadata JSON, timestamps)
//! is replaced by a default and logged; one bad field never hides a page.

use agency_store::{ActivityAction, ActivityEntry, PageRecord, SectionRecord};
use agency_templates::SectionType;
use chrono::{DateTime, Utc};

#[derive(sqlx::FromRow)]
pub(crate) struct PageRow {
    page_path: String,
    title: String,
    meta_title: Option<String>,
    meta_description: Option<String>,
    is_published: bool,
}

impl From<PageRow> for PageRecord {
    fn from(row: PageRow) -> Self {
        Self {
            page_path: row.page_path,
            title: row.title,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            is_published: row.is_published,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SectionRow {
    page_path: String,
    section_key: String,
    title: Option<String>,
    content: Option<String>,
    section_type: String,
    display_order: i32,
    metadata: String,
    is_active: bool,
}

impl From<SectionRow> for SectionRecord {
    fn from(row: SectionRow) -> Self {
        let section_type = row.section_type.parse().unwrap_or_else(|e| {
            tracing::warn!(
                path = %row.page_path,
                section_key = %row.section_key,
                error = %e,
                "Malformed section type, rendering as text"
            );
            SectionType::Text
        });
        let metadata = parse_metadata(&row.metadata).unwrap_or_else(|e| {
            tracing::warn!(
                path = %row.page_path,
                section_key = %row.section_key,
                error = %e,
                "Malformed section metadata, using empty object"
            );
            serde_json::Value::Object(serde_json::Map::new())
        });
        Self {
            page_path: row.page_path,
            section_key: row.section_key,
            title: row.title,
            content: row.content,
            section_type,
            display_order: row.display_order,
            metadata,
            is_active: row.is_active,
        }
    }
}

fn parse_metadata(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

#[derive(sqlx::FromRow)]
pub(crate) struct ActivityRow {
    id: i64,
    action: String,
    page_path: String,
    section_key: Option<String>,
    detail: Option<String>,
    recorded_at: String,
}

impl ActivityRow {
    /// Convert to an entry, skipping rows whose action is unknown.
    pub(crate) fn into_entry(self) -> Option<ActivityEntry> {
        let action: ActivityAction = match self.action.parse() {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(id = self.id, error = %e, "Skipping malformed activity entry");
                return None;
            }
        };
        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        Some(ActivityEntry {
            id: self.id,
            action,
            page_path: self.page_path,
            section_key: self.section_key,
            detail: self.detail,
            recorded_at,
        })
    }
}

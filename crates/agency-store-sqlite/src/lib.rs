//! `SQLite` content store for the agency content engine.
//!
//! This crate provides [`SqliteStore`], a `sqlx`-backed implementation of the
//! [`ContentStore`](agency_store::ContentStore) trait. It handles:
//!
//! - Schema creation on connect (`page_content`, `page_sections`, `activity_log`)
//! - Unique keys on `page_path` and `(page_path, section_key)`, reported as
//!   [`StoreErrorKind::AlreadyExists`]
//! - Change notification for writes made through this process
//!
//! # Example
//!
//! ```ignore
//! use agency_store::ContentStore;
//! use agency_store_sqlite::SqliteStore;
//!
//! let store = SqliteStore::connect("sqlite://agency.db", 4).await?;
//! let pages = store.pages().await?;
//! ```

mod rows;
mod schema;

use std::str::FromStr;
use std::time::Duration;

use agency_store::{
    ActivityEntry, ChangeFeed, ContentStore, ErrorStatus, NewActivity, PagePatch, PageRecord,
    SectionFilter, SectionPatch, SectionRecord, StoreError, StoreErrorKind, StoreEvent,
    StoreEventKind, StoreEventReceiver, Table, WatchHandle,
};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use rows::{ActivityRow, PageRow, SectionRow};

/// Backend identifier for error messages.
const BACKEND: &str = "Sqlite";

const PAGE_COLUMNS: &str = "page_path, title, meta_title, meta_description, is_published";
const SECTION_COLUMNS: &str =
    "page_path, section_key, title, content, section_type, display_order, metadata, is_active";

/// Convert a `sqlx` error into a [`StoreError`] with page path context.
fn store_error(err: sqlx::Error, path: &str) -> StoreError {
    let (kind, status) = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            (StoreErrorKind::AlreadyExists, ErrorStatus::Permanent)
        }
        sqlx::Error::RowNotFound => (StoreErrorKind::NotFound, ErrorStatus::Permanent),
        sqlx::Error::PoolTimedOut => (StoreErrorKind::Timeout, ErrorStatus::Temporary),
        sqlx::Error::Io(_) => (StoreErrorKind::Unavailable, ErrorStatus::Temporary),
        sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            (StoreErrorKind::Unavailable, ErrorStatus::Persistent)
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            (StoreErrorKind::InvalidData, ErrorStatus::Permanent)
        }
        _ => (StoreErrorKind::Other, ErrorStatus::Permanent),
    };
    StoreError::new(kind)
        .with_status(status)
        .with_backend(BACKEND)
        .with_path(path)
        .with_source(err)
}

/// `SQLite`-backed content store.
///
/// `SQLite` has no change feed of its own, so committed writes are published
/// to an in-process [`ChangeFeed`]. Watchers see every write made through
/// this store instance.
#[derive(Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Connect to a database URL (e.g., `sqlite://agency.db`) and create the
    /// schema if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid, the database can't be
    /// opened, or schema creation fails.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| store_error(e, ""))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| store_error(e, ""))?;
        Self::from_pool(pool).await
    }

    /// Open a private in-memory database.
    ///
    /// Uses a single connection, since every `SQLite` memory connection is its
    /// own database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database can't be created.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| store_error(e, ""))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| store_error(e, ""))?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        let store = Self {
            pool,
            feed: ChangeFeed::new(),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they don't exist.
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(schema::SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, ""))?;
        tracing::debug!("Content store schema ready");
        Ok(())
    }

    /// Check database connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database can't be queried.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, ""))?;
        Ok(())
    }

    /// Underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Number of live change-feed watchers for a path.
    #[must_use]
    pub fn watcher_count(&self, path: &str) -> usize {
        self.feed.watcher_count(path)
    }

    fn committed(&self, table: Table, path: &str, kind: StoreEventKind) {
        self.feed.publish(&StoreEvent::new(table, path, kind));
    }
}

fn metadata_text(metadata: &serde_json::Value) -> String {
    metadata.to_string()
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn page(&self, path: &str) -> Result<Option<PageRecord>, StoreError> {
        let row = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page_content WHERE page_path = ?"
        ))
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error(e, path))?;
        Ok(row.map(PageRecord::from))
    }

    async fn pages(&self) -> Result<Vec<PageRecord>, StoreError> {
        let rows = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page_content ORDER BY page_path"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, ""))?;
        Ok(rows.into_iter().map(PageRecord::from).collect())
    }

    async fn sections(
        &self,
        path: &str,
        filter: SectionFilter,
    ) -> Result<Vec<SectionRecord>, StoreError> {
        let active_clause = match filter {
            SectionFilter::Active => " AND is_active = 1",
            SectionFilter::All => "",
        };
        let rows = sqlx::query_as::<_, SectionRow>(&format!(
            "SELECT {SECTION_COLUMNS} FROM page_sections WHERE page_path = ?{active_clause} ORDER BY id"
        ))
        .bind(path)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, path))?;
        Ok(rows.into_iter().map(SectionRecord::from).collect())
    }

    async fn insert_page(&self, page: PageRecord) -> Result<PageRecord, StoreError> {
        sqlx::query(
            "INSERT INTO page_content (page_path, title, meta_title, meta_description, is_published) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&page.page_path)
        .bind(&page.title)
        .bind(&page.meta_title)
        .bind(&page.meta_description)
        .bind(page.is_published)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, &page.page_path))?;

        self.committed(Table::PageContent, &page.page_path, StoreEventKind::Inserted);
        Ok(page)
    }

    async fn insert_section(&self, section: SectionRecord) -> Result<SectionRecord, StoreError> {
        sqlx::query(
            "INSERT INTO page_sections \
             (page_path, section_key, title, content, section_type, display_order, metadata, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&section.page_path)
        .bind(&section.section_key)
        .bind(&section.title)
        .bind(&section.content)
        .bind(section.section_type.as_str())
        .bind(section.display_order)
        .bind(metadata_text(&section.metadata))
        .bind(section.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, &section.page_path))?;

        self.committed(Table::PageSections, &section.page_path, StoreEventKind::Inserted);
        Ok(section)
    }

    async fn update_page(&self, path: &str, patch: &PagePatch) -> Result<PageRecord, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| store_error(e, path))?;

        let mut page: PageRecord = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page_content WHERE page_path = ?"
        ))
        .bind(path)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error(e, path))?
        .ok_or_else(|| StoreError::not_found(path).with_backend(BACKEND))?
        .into();

        patch.apply(&mut page);

        sqlx::query(
            "UPDATE page_content SET title = ?, meta_title = ?, meta_description = ?, \
             is_published = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
             WHERE page_path = ?",
        )
        .bind(&page.title)
        .bind(&page.meta_title)
        .bind(&page.meta_description)
        .bind(page.is_published)
        .bind(path)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error(e, path))?;

        tx.commit().await.map_err(|e| store_error(e, path))?;

        self.committed(Table::PageContent, path, StoreEventKind::Updated);
        Ok(page)
    }

    async fn update_section(
        &self,
        path: &str,
        section_key: &str,
        patch: &SectionPatch,
    ) -> Result<SectionRecord, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| store_error(e, path))?;

        let mut section: SectionRecord = sqlx::query_as::<_, SectionRow>(&format!(
            "SELECT {SECTION_COLUMNS} FROM page_sections WHERE page_path = ? AND section_key = ?"
        ))
        .bind(path)
        .bind(section_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error(e, path))?
        .ok_or_else(|| StoreError::not_found(path).with_backend(BACKEND))?
        .into();

        patch.apply(&mut section);

        sqlx::query(
            "UPDATE page_sections SET title = ?, content = ?, section_type = ?, display_order = ?, \
             metadata = ?, is_active = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
             WHERE page_path = ? AND section_key = ?",
        )
        .bind(&section.title)
        .bind(&section.content)
        .bind(section.section_type.as_str())
        .bind(section.display_order)
        .bind(metadata_text(&section.metadata))
        .bind(section.is_active)
        .bind(path)
        .bind(section_key)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error(e, path))?;

        tx.commit().await.map_err(|e| store_error(e, path))?;

        self.committed(Table::PageSections, path, StoreEventKind::Updated);
        Ok(section)
    }

    async fn record_activity(&self, entry: NewActivity) -> Result<ActivityEntry, StoreError> {
        let recorded_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO activity_log (action, page_path, section_key, detail, recorded_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.action.as_str())
        .bind(&entry.page_path)
        .bind(&entry.section_key)
        .bind(&entry.detail)
        .bind(recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .execute(&self.pool)
        .await
        .map_err(|e| store_error(e, &entry.page_path))?;

        Ok(ActivityEntry {
            id: result.last_insert_rowid(),
            action: entry.action,
            page_path: entry.page_path,
            section_key: entry.section_key,
            detail: entry.detail,
            recorded_at,
        })
    }

    async fn activities(&self, limit: usize) -> Result<Vec<ActivityEntry>, StoreError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, action, page_path, section_key, detail, recorded_at \
             FROM activity_log ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error(e, ""))?;
        Ok(rows.into_iter().filter_map(ActivityRow::into_entry).collect())
    }

    fn watch(&self, path: &str) -> Result<(StoreEventReceiver, WatchHandle), StoreError> {
        Ok(self.feed.watch(path))
    }
}

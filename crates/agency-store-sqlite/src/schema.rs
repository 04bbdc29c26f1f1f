//! Table definitions.
//!
//! `page_sections` carries `UNIQUE (page_path, section_key)` over active and
//! inactive rows alike, so a soft-deleted section is never re-seeded.

pub(crate) const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS page_content (
    page_path        TEXT PRIMARY KEY NOT NULL,
    title            TEXT NOT NULL,
    meta_title       TEXT,
    meta_description TEXT,
    is_published     INTEGER NOT NULL DEFAULT 1,
    updated_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS page_sections (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    page_path     TEXT NOT NULL,
    section_key   TEXT NOT NULL,
    title         TEXT,
    content       TEXT,
    section_type  TEXT NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    metadata      TEXT NOT NULL DEFAULT '{}',
    is_active     INTEGER NOT NULL DEFAULT 1,
    updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE (page_path, section_key)
);

CREATE INDEX IF NOT EXISTS idx_page_sections_path ON page_sections (page_path, is_active);

CREATE TABLE IF NOT EXISTS activity_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    action      TEXT NOT NULL,
    page_path   TEXT NOT NULL,
    section_key TEXT,
    detail      TEXT,
    recorded_at TEXT NOT NULL
);
";

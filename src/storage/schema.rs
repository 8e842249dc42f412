//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Reel-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per harvested item; list columns hold JSON arrays
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    page_url TEXT NOT NULL,
    name TEXT NOT NULL,
    en_name TEXT,
    thumbnail TEXT,
    directors TEXT NOT NULL,
    actors TEXT NOT NULL,
    categories TEXT NOT NULL,
    description TEXT,
    album_name TEXT,
    album_thumbnail TEXT,
    album_page_url TEXT,
    default_page_url TEXT,
    playlist_id TEXT NOT NULL,
    vid TEXT NOT NULL,
    pid TEXT,
    update_time TEXT,
    publish_year TEXT,
    area TEXT,
    play_length TEXT,
    publish_time TEXT,
    up_vote INTEGER NOT NULL DEFAULT 0,
    down_vote INTEGER NOT NULL DEFAULT 0,
    crawled_at TEXT NOT NULL,
    UNIQUE(run_id, page_url)
);

CREATE INDEX IF NOT EXISTS idx_records_page_url ON records(page_url);
CREATE INDEX IF NOT EXISTS idx_records_vid ON records(vid);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, RunStore, StorageError, StorageResult};
use crate::storage::{EnrichedRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{ffi, params, Connection, ErrorCode, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status";

const RECORD_COLUMNS: &str = "name, en_name, thumbnail, directors, actors, categories, description,
     page_url, album_name, album_thumbnail, album_page_url, default_page_url, playlist_id, vid,
     pid, update_time, publish_year, area, play_length, publish_time, up_vote, down_vote";

/// SQLite storage backend
///
/// A single connection is shared behind a mutex; each insert takes the lock
/// for exactly one transaction.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens or creates the database at `path` and initializes the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }
}

impl RecordStore for SqliteRecordStore {
    fn create_schema(&self) -> StorageResult<()> {
        initialize_schema(&*self.conn()?)?;
        Ok(())
    }

    fn insert_record(&self, run_id: i64, record: &EnrichedRecord) -> StorageResult<i64> {
        let directors = to_json(&record.directors)?;
        let actors = to_json(&record.actors)?;
        let categories = to_json(&record.categories)?;
        let now = Utc::now().to_rfc3339();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO records (run_id, crawled_at, {RECORD_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
            ),
            params![
                run_id,
                now,
                record.name,
                record.en_name,
                record.thumbnail,
                directors,
                actors,
                categories,
                record.description,
                record.page_url,
                record.album_name,
                record.album_thumbnail,
                record.album_page_url,
                record.default_page_url,
                record.playlist_id,
                record.vid,
                record.pid,
                record.update_time,
                record.publish_year,
                record.area,
                record.play_length,
                record.publish_time,
                clamp_count(record.up_vote),
                clamp_count(record.down_vote),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref failure, _)
                if failure.code == ErrorCode::ConstraintViolation
                    && failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StorageError::DuplicateRecord {
                    page_url: record.page_url.clone(),
                    run_id,
                }
            }
            other => StorageError::Sqlite(other),
        })?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(id)
    }
}

impl RunStore for SqliteRecordStore {
    fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn()?.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn()?
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![run_id],
                row_to_run,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::RunNotFound(run_id),
                other => StorageError::Sqlite(other),
            })
    }

    fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY id DESC"))?;
        let runs = stmt
            .query_map([], row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    fn count_records(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = match run_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM records WHERE run_id = ?1",
                params![id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn records_for_run(&self, run_id: i64) -> StorageResult<Vec<EnrichedRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE run_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row_to_record(row)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut record, directors, actors, categories)| {
                record.directors = from_json(&directors)?;
                record.actors = from_json(&actors)?;
                record.categories = from_json(&categories)?;
                Ok(record)
            })
            .collect()
    }
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
    })
}

/// Maps the scalar columns of `RECORD_COLUMNS`; list columns are decoded by the caller
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<EnrichedRecord> {
    Ok(EnrichedRecord {
        name: row.get(0)?,
        en_name: row.get(1)?,
        thumbnail: row.get(2)?,
        directors: Vec::new(),
        actors: Vec::new(),
        categories: Vec::new(),
        description: row.get(6)?,
        page_url: row.get(7)?,
        album_name: row.get(8)?,
        album_thumbnail: row.get(9)?,
        album_page_url: row.get(10)?,
        default_page_url: row.get(11)?,
        playlist_id: row.get(12)?,
        vid: row.get(13)?,
        pid: row.get(14)?,
        update_time: row.get(15)?,
        publish_year: row.get(16)?,
        area: row.get(17)?,
        play_length: row.get(18)?,
        publish_time: row.get(19)?,
        up_vote: row.get::<_, i64>(20)?.max(0) as u64,
        down_vote: row.get::<_, i64>(21)?.max(0) as u64,
    })
}

fn clamp_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn to_json(values: &[String]) -> StorageResult<String> {
    serde_json::to_string(values).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_json(text: &str) -> StorageResult<Vec<String>> {
    serde_json::from_str(text).map_err(|e| StorageError::Serialization(e.to_string()))
}

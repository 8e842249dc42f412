//! Storage traits and error types
//!
//! This module defines the trait interfaces for storage backends and
//! associated error types.

use crate::storage::{EnrichedRecord, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record for {page_url} already stored in run {run_id}")]
    DuplicateRecord { page_url: String, run_id: i64 },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of harvested records
///
/// Workers call `insert_record` concurrently; every call is its own
/// transaction, so an interrupted harvest leaves fewer rows, never partial ones.
pub trait RecordStore: Send + Sync {
    /// Creates tables and indexes if they do not exist yet
    fn create_schema(&self) -> StorageResult<()>;

    /// Inserts one record produced during `run_id`
    ///
    /// # Returns
    ///
    /// The row ID of the new record, or `StorageError::DuplicateRecord` when
    /// the same `page_url` was already stored during this run.
    fn insert_record(&self, run_id: i64, record: &EnrichedRecord) -> StorageResult<i64>;
}

/// Run bookkeeping and read-side queries
pub trait RunStore {
    /// Creates a new run in the `running` state
    fn create_run(&self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run finished with the given status
    fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets every run, most recent first
    fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;

    /// Counts stored records, for one run or for all runs
    fn count_records(&self, run_id: Option<i64>) -> StorageResult<u64>;

    /// Loads the records stored during a run, in insertion order
    fn records_for_run(&self, run_id: i64) -> StorageResult<Vec<EnrichedRecord>>;
}

//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - One-record-per-item persistence with its own transaction per insert
//! - Run tracking (started, completed, interrupted)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRecordStore;
pub use traits::{RecordStore, RunStore, StorageError, StorageResult};

use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens (and creates if needed) the record database
pub fn open_storage(path: &Path) -> Result<SqliteRecordStore, HarvestError> {
    Ok(SqliteRecordStore::new(path)?)
}

/// The normalized record stored for one harvested item
///
/// `page_url` is the item's detail link and joins the record back to the
/// work item it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub name: String,
    pub en_name: Option<String>,
    pub thumbnail: Option<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub categories: Vec<String>,
    pub description: Option<String>,
    pub page_url: String,

    pub album_name: Option<String>,
    pub album_thumbnail: Option<String>,
    pub album_page_url: Option<String>,
    pub default_page_url: Option<String>,

    pub playlist_id: String,
    pub vid: String,
    pub pid: Option<String>,

    pub update_time: Option<String>,
    pub publish_year: Option<String>,
    pub area: Option<String>,
    pub play_length: Option<String>,
    pub publish_time: Option<String>,

    pub up_vote: u64,
    pub down_vote: u64,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

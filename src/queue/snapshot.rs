//! Pending-queue snapshots
//!
//! When a harvest is interrupted, the links nobody has claimed yet are written
//! to a small versioned JSON document. The next run can load it once; loading
//! removes the file so the same snapshot is never resumed twice.

use crate::SnapshotError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    saved_at: String,
    links: Vec<String>,
}

/// Only the version, so that newer layouts are rejected before being decoded
#[derive(Debug, Deserialize)]
struct VersionProbe {
    version: u32,
}

/// File-backed store for the unclaimed part of a work queue
#[derive(Debug, Clone)]
pub struct QueueSnapshotStore {
    path: PathBuf,
}

impl QueueSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a snapshot is waiting to be resumed
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes `links` as the pending snapshot, replacing any previous one
    ///
    /// The document is written next to the target and renamed into place, so
    /// a crash mid-write never leaves a truncated snapshot behind.
    pub fn save(&self, links: &[String]) -> Result<(), SnapshotError> {
        let snapshot = SnapshotFile {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now().to_rfc3339(),
            links: links.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&snapshot)?;

        let staging = self.path.with_extension("partial");
        fs::write(&staging, body)?;
        fs::rename(&staging, &self.path)?;

        tracing::debug!(
            "Saved {} pending links to {}",
            links.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Reads the snapshot and deletes it
    ///
    /// # Errors
    ///
    /// * `SnapshotError::NotFound` - no snapshot exists (or it was already loaded)
    /// * `SnapshotError::UnsupportedVersion` - written by an incompatible build;
    ///   the file is left in place
    /// * `SnapshotError::Malformed` - not a snapshot document
    pub fn load(&self) -> Result<Vec<String>, SnapshotError> {
        let body = match fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let probe: VersionProbe = serde_json::from_slice(&body)?;
        if probe.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: probe.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let snapshot: SnapshotFile = serde_json::from_slice(&body)?;
        fs::remove_file(&self.path)?;

        tracing::debug!(
            "Loaded {} pending links saved at {}",
            snapshot.links.len(),
            snapshot.saved_at
        );
        Ok(snapshot.links)
    }

    /// Deletes the snapshot without reading it
    ///
    /// Returns true if a snapshot was removed.
    pub fn discard(&self) -> Result<bool, SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

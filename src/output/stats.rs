//! Statistics from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! run and record statistics from the storage layer.

use crate::storage::{RunRecord, RunStatus, RunStore};
use crate::Result;
use std::collections::HashMap;

/// One run with the number of records it stored
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub run: RunRecord,
    pub records: u64,
}

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Records across all runs
    pub total_records: u64,

    /// Count of runs by final status
    pub runs_by_status: HashMap<RunStatus, u64>,

    /// Every run, newest first
    pub runs: Vec<RunStatistics>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `store` - The run store to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(store: &dyn RunStore) -> Result<HarvestStatistics> {
    let total_records = store.count_records(None)?;

    let mut runs_by_status = HashMap::new();
    let mut runs = Vec::new();

    for run in store.list_runs()? {
        *runs_by_status.entry(run.status).or_insert(0) += 1;
        let records = store.count_records(Some(run.id))?;
        runs.push(RunStatistics { run, records });
    }

    Ok(HarvestStatistics {
        total_records,
        runs_by_status,
        runs,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Runs: {}", stats.runs.len());
    println!();

    if !stats.runs_by_status.is_empty() {
        println!("Runs by Status:");
        let mut status_counts: Vec<_> = stats.runs_by_status.iter().collect();
        status_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (status, count) in status_counts {
            println!("  {}: {}", status.to_db_string(), count);
        }
        println!();
    }

    if !stats.runs.is_empty() {
        println!("Runs:");
        for entry in &stats.runs {
            println!(
                "  #{} {} [{}] {} records (config {})",
                entry.run.id,
                entry.run.started_at,
                entry.run.status.to_db_string(),
                entry.records,
                short_hash(&entry.run.config_hash)
            );
        }
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

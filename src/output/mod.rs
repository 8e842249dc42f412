//! Output module for run reports
//!
//! This module handles:
//! - The end-of-run summary
//! - Statistics read back from the harvest database

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics, RunStatistics};

use crate::crawler::RunSummary;

/// Formats the end-of-run summary
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::new();

    let outcome = if summary.interrupted {
        "interrupted"
    } else {
        "completed"
    };
    lines.push(format!("=== Harvest run {} {} ===", summary.run_id, outcome));

    if summary.resumed {
        lines.push(format!("  Resumed links: {}", summary.collected_links));
    } else {
        lines.push(format!("  Listing pages: {}", summary.planned_pages));
        lines.push(format!("  Item links: {}", summary.collected_links));
    }
    lines.push(format!("  Inserted: {}", summary.inserted));
    lines.push(format!("  Skipped: {}", summary.skipped));

    if summary.interrupted {
        lines.push(format!("  Pending (saved for --resume): {}", summary.remaining));
    }
    lines.push(format!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64()));

    lines.join("\n")
}

/// Prints the end-of-run summary to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("{}", format_run_summary(summary));
}

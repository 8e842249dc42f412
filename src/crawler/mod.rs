//! Harvesting pipeline
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching
//! - Listing and detail page extraction
//! - Pagination planning and link collection
//! - Item enrichment from the metadata and vote endpoints
//! - Overall run coordination

mod collector;
mod coordinator;
mod enricher;
mod extract;
mod fetcher;
mod metadata;
mod planner;

pub use collector::LinkCollectionPool;
pub use coordinator::{Coordinator, CrawlRequest, ResumeMode, RunSummary};
pub use enricher::{
    assemble_record, EnrichmentReport, ItemEnricher, ItemEnrichmentPool, ItemError, ItemMetadata,
};
pub use extract::{
    DetailParser, ItemIdentifiers, ListingLinkExtractor, ListingPage, PatternDetailParser,
    SelectorExtractor,
};
pub use fetcher::{build_http_client, fetch_text, FetchError};
pub use metadata::{
    parse_metadata, parse_vote_counts, AlbumMetadata, VideoVariant, VoteCounts,
};
pub use planner::{plan_page_range, PaginationPlan, PaginationPlanner};

use crate::config::Config;
use crate::Result;
use tokio_util::sync::CancellationToken;

/// Runs a complete harvest
///
/// This is the main entry point for a run. It will:
/// 1. Open the record store and record the run
/// 2. Resume from a pending snapshot, or plan and collect item links
/// 3. Enrich and store every item
/// 4. Save unclaimed links if `cancel` fires
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file
/// * `request` - Start URL, limit and resume mode
/// * `cancel` - Stops the run; pending work is saved for later
pub async fn crawl(
    config: Config,
    config_hash: &str,
    request: CrawlRequest,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.run(request, cancel).await
}

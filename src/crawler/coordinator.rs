//! Harvest coordinator - run orchestration
//!
//! This module ties the pieces of a run together:
//! - Opening the record store and recording the run
//! - Resuming from a queue snapshot, or planning and collecting anew
//! - Driving the enrichment pool over the collected links
//! - Saving unclaimed work when the run is interrupted

use crate::config::Config;
use crate::crawler::collector::LinkCollectionPool;
use crate::crawler::enricher::{ItemEnricher, ItemEnrichmentPool};
use crate::crawler::extract::{ListingLinkExtractor, SelectorExtractor};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::planner::PaginationPlanner;
use crate::queue::{QueueSnapshotStore, WorkQueue};
use crate::storage::{open_storage, RunStatus, RunStore, SqliteRecordStore};
use crate::url::PageUrlCodec;
use crate::{ConfigError, HarvestError, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Whether a pending snapshot should be picked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Continue from the snapshot when one exists
    #[default]
    Resume,
    /// Throw any snapshot away and start from the listing
    Fresh,
}

/// What to harvest
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    /// Listing URL to start from; falls back to `crawl.start-url`
    pub start_url: Option<String>,
    /// Maximum number of items (0 = no limit)
    pub limit: usize,
    pub resume: ResumeMode,
}

/// Outcome of one run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: i64,
    /// The work came from a snapshot instead of the listing
    pub resumed: bool,
    pub planned_pages: usize,
    pub collected_links: usize,
    pub inserted: u64,
    pub skipped: u64,
    /// Links saved to the snapshot for a later run
    pub remaining: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Main harvest coordinator
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    store: Arc<SqliteRecordStore>,
    snapshots: QueueSnapshotStore,
    client: Client,
    extractor: Arc<dyn ListingLinkExtractor>,
    codec: PageUrlCodec,
}

impl Coordinator {
    /// Creates a coordinator, opening the record store
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, recorded with each run
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self> {
        let store = open_storage(Path::new(&config.output.database_path))?;
        let snapshots = QueueSnapshotStore::new(&config.output.snapshot_path);

        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout),
        )?;
        let extractor = SelectorExtractor::new(&config.site)?;
        let codec = PageUrlCodec::new(&config.site.page_marker, &config.site.page_suffix)
            .map_err(|e| ConfigError::Validation(format!("Invalid page URL template: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            store: Arc::new(store),
            snapshots,
            client,
            extractor: Arc::new(extractor),
            codec,
        })
    }

    pub fn store(&self) -> &SqliteRecordStore {
        &self.store
    }

    pub fn snapshots(&self) -> &QueueSnapshotStore {
        &self.snapshots
    }

    /// Runs a harvest until done or until `cancel` fires
    ///
    /// An interrupted run is not an error: unclaimed links are saved to the
    /// snapshot and the summary reports `interrupted`.
    pub async fn run(&self, request: CrawlRequest, cancel: CancellationToken) -> Result<RunSummary> {
        let started = Instant::now();
        let pending = self.pending_links(request.resume)?;

        // Fail on a missing start URL before recording a run
        let start_url = match pending {
            Some(_) => None,
            None => Some(
                request
                    .start_url
                    .clone()
                    .or_else(|| self.config.crawl.start_url.clone())
                    .ok_or(HarvestError::MissingStartUrl)?,
            ),
        };

        let run_id = self.store.create_run(&self.config_hash)?;
        tracing::info!("Starting harvest run {}", run_id);

        let mut summary = RunSummary {
            run_id,
            ..RunSummary::default()
        };

        let links = match (pending, start_url) {
            (Some(links), _) => {
                tracing::info!("Resuming with {} pending links", links.len());
                summary.resumed = true;
                links
            }
            (None, Some(start_url)) => {
                let links = self
                    .plan_and_collect(&start_url, request.limit, &cancel, &mut summary)
                    .await;
                if cancel.is_cancelled() {
                    tracing::warn!("Interrupted before item harvesting began; nothing to resume");
                    return self.finish(summary, RunStatus::Interrupted, started);
                }
                links
            }
            (None, None) => return Err(HarvestError::MissingStartUrl),
        };
        summary.collected_links = links.len();

        let queue: Arc<WorkQueue<String>> = Arc::new(links.into_iter().collect());
        let enricher = ItemEnricher::new(self.client.clone(), &self.config.site);
        let pool = ItemEnrichmentPool::new(
            enricher,
            self.store.clone(),
            self.config.crawler.worker_count as usize,
        );

        let report = pool.run(run_id, Arc::clone(&queue), &cancel).await;
        summary.inserted = report.inserted;
        summary.skipped = report.skipped;

        if cancel.is_cancelled() {
            let remaining = queue.drain();
            summary.remaining = remaining.len();
            summary.interrupted = true;

            if !remaining.is_empty() {
                if let Err(e) = self.snapshots.save(&remaining) {
                    return Err(self.fail_unsaved(run_id, &remaining, e.into()));
                }
                tracing::warn!(
                    "Interrupted: saved {} pending links to {}",
                    remaining.len(),
                    self.snapshots.path().display()
                );
            }
            return self.finish(summary, RunStatus::Interrupted, started);
        }

        self.finish(summary, RunStatus::Completed, started)
    }

    /// Returns the snapshot's links when resuming, discarding it otherwise
    fn pending_links(&self, mode: ResumeMode) -> Result<Option<Vec<String>>> {
        if !self.snapshots.exists() {
            return Ok(None);
        }

        match mode {
            ResumeMode::Resume => Ok(Some(self.snapshots.load()?)),
            ResumeMode::Fresh => {
                self.snapshots.discard()?;
                tracing::info!(
                    "Discarded queue snapshot at {}",
                    self.snapshots.path().display()
                );
                Ok(None)
            }
        }
    }

    async fn plan_and_collect(
        &self,
        start_url: &str,
        limit: usize,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Vec<String> {
        let planner = PaginationPlanner::new(
            self.client.clone(),
            Arc::clone(&self.extractor),
            self.codec.clone(),
            self.config.crawler.items_per_page,
        );
        let plan = planner.plan(start_url, limit).await;
        summary.planned_pages = plan.len();

        let collector = LinkCollectionPool::new(
            self.client.clone(),
            Arc::clone(&self.extractor),
            self.config.crawler.worker_count as usize,
        );
        collector.collect(&plan, limit, cancel).await
    }

    /// Marks the run failed after the snapshot could not be written
    ///
    /// The pending links are logged so they can be recovered by hand.
    fn fail_unsaved(
        &self,
        run_id: i64,
        remaining: &[String],
        error: HarvestError,
    ) -> HarvestError {
        tracing::error!(
            "Could not save {} pending links to {}: {}",
            remaining.len(),
            self.snapshots.path().display(),
            error
        );
        for link in remaining {
            tracing::error!("Unsaved pending link: {}", link);
        }

        if let Err(e) = self.store.finish_run(run_id, RunStatus::Failed) {
            tracing::error!("Could not mark run {} as failed: {}", run_id, e);
        }
        error
    }

    fn finish(
        &self,
        mut summary: RunSummary,
        status: RunStatus,
        started: Instant,
    ) -> Result<RunSummary> {
        self.store.finish_run(summary.run_id, status)?;
        summary.elapsed = started.elapsed();

        tracing::info!(
            "Run {} {}: {} inserted, {} skipped in {:?}",
            summary.run_id,
            status.to_db_string(),
            summary.inserted,
            summary.skipped,
            summary.elapsed
        );
        Ok(summary)
    }
}

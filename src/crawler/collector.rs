//! Listing page collection
//!
//! A fixed number of workers claim planned listing pages from a shared queue,
//! fetch them and extract the item links. Results are put back into plan
//! order before deduplication so the outcome does not depend on which worker
//! finished first.

use crate::crawler::extract::ListingLinkExtractor;
use crate::crawler::fetcher::fetch_text;
use crate::crawler::planner::PaginationPlan;
use crate::queue::WorkQueue;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Collects item links from the pages of a [`PaginationPlan`]
pub struct LinkCollectionPool {
    client: Client,
    extractor: Arc<dyn ListingLinkExtractor>,
    workers: usize,
}

impl LinkCollectionPool {
    pub fn new(client: Client, extractor: Arc<dyn ListingLinkExtractor>, workers: usize) -> Self {
        Self {
            client,
            extractor,
            workers: workers.max(1),
        }
    }

    /// Fetches every planned page and returns the unique item links
    ///
    /// Links keep plan order (page by page, document order within a page).
    /// A non-zero `limit` truncates the result after deduplication. Pages that
    /// fail to load are logged and contribute nothing.
    pub async fn collect(
        &self,
        plan: &PaginationPlan,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let queue: Arc<WorkQueue<(usize, String)>> =
            Arc::new(plan.pages().iter().cloned().enumerate().collect());
        let results: Arc<Mutex<Vec<(usize, Vec<String>)>>> = Arc::new(Mutex::new(Vec::new()));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers.min(plan.len().max(1)) {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let client = self.client.clone();
            let extractor = Arc::clone(&self.extractor);
            let cancel = cancel.clone();

            workers.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        debug!("Collector {} stopping: cancelled", worker_id);
                        break;
                    }
                    let Some(claim) = queue.claim() else { break };
                    let (index, page_url) = &*claim;

                    let links = collect_page(&client, extractor.as_ref(), page_url).await;
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((*index, links));
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Collector task failed: {}", e);
            }
        }

        let mut pages = {
            let mut results = results.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *results)
        };
        pages.sort_by_key(|(index, _)| *index);

        let total: usize = pages.iter().map(|(_, links)| links.len()).sum();
        let mut seen = HashSet::with_capacity(total);
        let mut links: Vec<String> = pages
            .into_iter()
            .flat_map(|(_, links)| links)
            .filter(|link| seen.insert(link.clone()))
            .collect();

        if limit > 0 && links.len() > limit {
            links.truncate(limit);
        }

        info!(
            "Collected {} item links ({} extracted) from {} listing pages",
            links.len(),
            total,
            plan.len()
        );
        links
    }
}

async fn collect_page(
    client: &Client,
    extractor: &dyn ListingLinkExtractor,
    page_url: &str,
) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(base) => base,
        Err(e) => {
            warn!("Skipping listing page {}: {}", page_url, e);
            return Vec::new();
        }
    };

    let body = match fetch_text(client, page_url, &[], None).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Skipping listing page: {}", e);
            return Vec::new();
        }
    };

    let page = extractor.scan(&body, &base);
    if page.next_page_url.is_none() {
        debug!("{} has no next-page control", page_url);
    }
    debug!("{} links on {}", page.item_links.len(), page_url);
    page.item_links
}

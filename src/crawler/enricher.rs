//! Item enrichment
//!
//! Every collected link goes through the same chain:
//!
//! 1. fetch the detail page and read the playlist and video identifiers
//! 2. fetch the album metadata and pick the variant for this link
//! 3. fetch the engagement counts
//! 4. assemble the record and hand it to the store
//!
//! The pool runs a fixed number of workers over a shared [`WorkQueue`]. A
//! failure at any step skips that one item; the rest of the run continues.

use crate::config::SiteConfig;
use crate::crawler::extract::{DetailParser, ItemIdentifiers, PatternDetailParser};
use crate::crawler::fetcher::{fetch_text, FetchError};
use crate::crawler::metadata::{
    parse_metadata, parse_vote_counts, AlbumMetadata, VideoVariant, VoteCounts,
};
use crate::queue::WorkQueue;
use crate::storage::{EnrichedRecord, RecordStore, StorageError};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why an item was skipped
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Detail page unavailable: {0}")]
    Transport(#[from] FetchError),

    #[error("{identifier} not found on {url}")]
    IdentifierNotFound {
        url: String,
        identifier: &'static str,
    },

    #[error("Metadata unavailable for {url}: {reason}")]
    MetadataUnavailable { url: String, reason: String },

    #[error("Vote data unavailable for {url}: {reason}")]
    VoteDataUnavailable { url: String, reason: String },

    #[error("Could not store {url}: {source}")]
    Storage {
        url: String,
        #[source]
        source: StorageError,
    },
}

/// Album metadata together with the variant matching the item link
#[derive(Debug, Clone)]
pub struct ItemMetadata {
    pub album: AlbumMetadata,
    pub variant: VideoVariant,
}

/// Runs the fetch chain for single items
pub struct ItemEnricher {
    client: Client,
    detail_parser: Arc<dyn DetailParser>,
    detail_encoding: String,
    metadata_url: String,
    vote_url: String,
}

impl ItemEnricher {
    pub fn new(client: Client, site: &SiteConfig) -> Self {
        Self {
            client,
            detail_parser: Arc::new(PatternDetailParser),
            detail_encoding: site.detail_encoding.clone(),
            metadata_url: site.metadata_url.clone(),
            vote_url: site.vote_url.clone(),
        }
    }

    /// Replaces the detail-page parser
    pub fn with_detail_parser(mut self, parser: Arc<dyn DetailParser>) -> Self {
        self.detail_parser = parser;
        self
    }

    /// Runs all steps for `link`
    pub async fn enrich(&self, link: &str) -> Result<EnrichedRecord, ItemError> {
        let ids = self.fetch_identifiers(link).await?;
        let metadata = self.fetch_metadata(link, &ids).await?;
        let votes = self.fetch_votes(link, &ids).await?;
        Ok(assemble_record(link, ids, metadata, votes))
    }

    /// Step 1: detail page → identifiers
    pub async fn fetch_identifiers(&self, link: &str) -> Result<ItemIdentifiers, ItemError> {
        let charset = Some(self.detail_encoding.as_str());
        let body = fetch_text(&self.client, link, &[], charset).await?;

        self.detail_parser
            .extract_identifiers(&body)
            .map_err(|identifier| ItemError::IdentifierNotFound {
                url: link.to_string(),
                identifier,
            })
    }

    /// Step 2: album metadata and the variant for `link`
    pub async fn fetch_metadata(
        &self,
        link: &str,
        ids: &ItemIdentifiers,
    ) -> Result<ItemMetadata, ItemError> {
        let unavailable = |reason: String| ItemError::MetadataUnavailable {
            url: link.to_string(),
            reason,
        };

        let query = [("playlistid", ids.playlist_id.as_str()), ("vid", ids.vid.as_str())];
        let body = fetch_text(&self.client, &self.metadata_url, &query, None)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let album = parse_metadata(&body).map_err(|e| unavailable(e.to_string()))?;
        let variant = album
            .select_variant(link)
            .cloned()
            .ok_or_else(|| {
                unavailable(format!(
                    "no variant among {} matches the link",
                    album.videos.len()
                ))
            })?;

        Ok(ItemMetadata { album, variant })
    }

    /// Step 3: up/down vote counts
    pub async fn fetch_votes(
        &self,
        link: &str,
        ids: &ItemIdentifiers,
    ) -> Result<VoteCounts, ItemError> {
        let unavailable = |reason: String| ItemError::VoteDataUnavailable {
            url: link.to_string(),
            reason,
        };

        let query = [("vid", ids.vid.as_str()), ("type", "1")];
        let body = fetch_text(&self.client, &self.vote_url, &query, None)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        parse_vote_counts(&body).map_err(unavailable)
    }
}

/// Step 4: builds the stored record from the fetched parts
pub fn assemble_record(
    link: &str,
    ids: ItemIdentifiers,
    metadata: ItemMetadata,
    votes: VoteCounts,
) -> EnrichedRecord {
    let ItemMetadata { album, variant } = metadata;

    EnrichedRecord {
        name: variant
            .name
            .or_else(|| album.album_name.clone())
            .unwrap_or_default(),
        en_name: album.tv_english_name,
        thumbnail: variant.large_pic_url,
        directors: album.directors,
        actors: album.actors,
        categories: album.categories,
        description: album.album_desc,
        page_url: link.to_string(),
        album_name: album.album_name,
        album_thumbnail: album.large_ver_pic_url,
        album_page_url: album.album_page_url,
        default_page_url: album.default_page_url,
        playlist_id: ids.playlist_id,
        vid: ids.vid,
        pid: album.pid,
        update_time: album.update_time,
        publish_year: album.publish_year,
        area: album.area,
        play_length: variant.play_length,
        publish_time: variant.publish_time,
        up_vote: votes.up_count,
        down_vote: votes.down_count,
    }
}

/// Outcome of an enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub inserted: u64,
    pub skipped: u64,
}

/// Fixed-size worker pool draining a queue of item links into the store
pub struct ItemEnrichmentPool {
    enricher: Arc<ItemEnricher>,
    store: Arc<dyn RecordStore>,
    workers: usize,
}

impl ItemEnrichmentPool {
    pub fn new(enricher: ItemEnricher, store: Arc<dyn RecordStore>, workers: usize) -> Self {
        Self {
            enricher: Arc::new(enricher),
            store,
            workers: workers.max(1),
        }
    }

    /// Processes links from `queue` until it is empty or `cancel` fires
    ///
    /// Workers check the token before claiming, so on cancellation in-flight
    /// items finish and everything unclaimed stays in the queue.
    pub async fn run(
        &self,
        run_id: i64,
        queue: Arc<WorkQueue<String>>,
        cancel: &CancellationToken,
    ) -> EnrichmentReport {
        let inserted = Arc::new(AtomicU64::new(0));
        let skipped = Arc::new(AtomicU64::new(0));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let enricher = Arc::clone(&self.enricher);
            let store = Arc::clone(&self.store);
            let inserted = Arc::clone(&inserted);
            let skipped = Arc::clone(&skipped);
            let cancel = cancel.clone();

            workers.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        debug!("Worker {} stopping: cancelled", worker_id);
                        break;
                    }
                    let Some(link) = queue.claim() else { break };

                    let outcome = match enricher.enrich(&link).await {
                        Ok(record) => store
                            .insert_record(run_id, &record)
                            .map(|_| record)
                            .map_err(|source| ItemError::Storage {
                                url: link.to_string(),
                                source,
                            }),
                        Err(e) => Err(e),
                    };

                    match outcome {
                        Ok(record) => {
                            let count = inserted.fetch_add(1, Ordering::SeqCst) + 1;
                            info!("[{}] inserted {} ({})", count, record.name, record.page_url);
                        }
                        Err(e) => {
                            skipped.fetch_add(1, Ordering::SeqCst);
                            warn!("Skipped {}: {}", *link, e);
                        }
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Enrichment worker failed: {}", e);
            }
        }

        if !cancel.is_cancelled() {
            queue.join().await;
        }

        EnrichmentReport {
            inserted: inserted.load(Ordering::SeqCst),
            skipped: skipped.load(Ordering::SeqCst),
        }
    }
}

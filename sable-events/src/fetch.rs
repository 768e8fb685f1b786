//! Fetch orchestration: indexer first, chain scan second.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use sable_common::InstanceKey;

use crate::indexer::IndexerApi;
use crate::scan::{scan_to_tip, ChainScanner};
use crate::store::{EventKind, EventPage, EventStore};
use crate::{Error, Result};

const INDEXER_ATTEMPTS: u32 = 5;
const INDEXER_BACKOFF: Duration = Duration::from_millis(500);

/// Where a page ultimately came from.
enum FetchOutcome {
    Indexer(EventPage),
    ChainScan(EventPage),
    Failed(String),
}

/// Pulls events into an [`EventStore`], preferring the hosted indexer and
/// degrading to a direct chain scan.
pub struct EventFetcher {
    indexer: Arc<dyn IndexerApi>,
    scanner: Option<Arc<dyn ChainScanner>>,
}

impl EventFetcher {
    pub fn new(indexer: Arc<dyn IndexerApi>, scanner: Option<Arc<dyn ChainScanner>>) -> Self {
        Self { indexer, scanner }
    }

    /// Indexer with retries, linear backoff between attempts.
    async fn try_indexer(
        &self,
        kind: EventKind,
        key: &InstanceKey,
        from_block: u64,
    ) -> std::result::Result<EventPage, String> {
        let chain_id = key.network.chain_id();
        let mut last_error = String::new();
        for attempt in 1..=INDEXER_ATTEMPTS {
            match self.indexer.fetch(kind, chain_id, &key.pair, from_block).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!(%kind, instance = %key, attempt, error = %e, "indexer fetch failed");
                    last_error = e.to_string();
                    if attempt < INDEXER_ATTEMPTS {
                        tokio::time::sleep(INDEXER_BACKOFF * attempt).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    async fn fetch(&self, kind: EventKind, key: &InstanceKey, from_block: u64) -> FetchOutcome {
        let indexer_error = match self.try_indexer(kind, key, from_block).await {
            Ok(page) => return FetchOutcome::Indexer(page),
            Err(detail) => detail,
        };

        let Some(scanner) = &self.scanner else {
            return FetchOutcome::Failed(indexer_error);
        };

        info!(%kind, instance = %key, "indexer unreachable, falling back to chain scan");
        match scan_to_tip(
            scanner.as_ref(),
            kind,
            key.network.chain_id(),
            &key.pair,
            from_block,
        )
        .await
        {
            Ok(page) => FetchOutcome::ChainScan(page),
            Err(e) => FetchOutcome::Failed(format!("indexer: {indexer_error}; scan: {e}")),
        }
    }

    /// Fetch everything newer than the stored cursor and merge it in.
    ///
    /// The cursor advances to one past the highest observed block, so the
    /// next refresh resumes where this one left off; an empty page leaves
    /// the cursor untouched.
    pub async fn refresh(
        &self,
        store: &mut EventStore,
        kind: EventKind,
        key: &InstanceKey,
    ) -> Result<()> {
        let from_block = store.last_queried_block(kind, key);
        let page = match self.fetch(kind, key, from_block).await {
            FetchOutcome::Indexer(page) | FetchOutcome::ChainScan(page) => page,
            FetchOutcome::Failed(detail) => {
                return Err(Error::EventsFetchFailed {
                    kind,
                    instance: key.clone(),
                    detail,
                })
            }
        };

        debug!(%kind, instance = %key, from_block, count = page.len(), "events refreshed");
        if let Some(last_block) = page.last_block() {
            store.set_last_queried_block(kind, key, last_block + 1);
        }
        store.append(key, page);
        Ok(())
    }
}

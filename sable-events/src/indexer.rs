//! Remote event-indexer client.
//!
//! The indexer exposes `GET /v1/deposits` and `GET /v1/withdrawals`,
//! paginated with a `next_from` continuation block. Pages are drained with
//! an accumulator loop so a long backlog never grows the stack.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use sable_common::PoolPair;

use crate::store::{DepositEvent, EventKind, EventPage, WithdrawalEvent};
use crate::{Error, Result};

const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Event source the fetch layer can query. Implemented by [`IndexerClient`]
/// in production and by in-process fakes in tests.
#[async_trait]
pub trait IndexerApi: Send + Sync {
    /// All events of `kind` for the instance starting at `from_block`,
    /// fully depaginated.
    async fn fetch(
        &self,
        kind: EventKind,
        chain_id: u64,
        pair: &PoolPair,
        from_block: u64,
    ) -> Result<EventPage>;
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    events: Vec<T>,
    /// Block to continue from; absent on the final page.
    #[serde(default)]
    next_from: Option<u64>,
}

/// HTTP client for the hosted event indexer.
pub struct IndexerClient {
    endpoint: String,
    http: Client,
}

impl IndexerClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    async fn page<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        chain_id: u64,
        pair: &PoolPair,
        from: u64,
    ) -> Result<Page<T>> {
        let url = format!("{}/v1/{path}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("chain_id", chain_id.to_string()),
                ("currency", pair.currency.ticker().to_string()),
                ("amount", pair.amount.clone()),
                ("from", from.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn drain<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        chain_id: u64,
        pair: &PoolPair,
        from_block: u64,
    ) -> Result<Vec<T>> {
        let mut accumulated = Vec::new();
        let mut from = from_block;
        loop {
            let page: Page<T> = self.page(path, chain_id, pair, from).await?;
            accumulated.extend(page.events);
            match page.next_from {
                // A continuation that does not advance would loop forever.
                Some(next) if next <= from => {
                    return Err(Error::MalformedResponse(format!(
                        "non-advancing continuation: {next} after {from}"
                    )));
                }
                Some(next) => from = next,
                None => break,
            }
        }
        debug!(path, chain_id, %pair, from_block, count = accumulated.len(), "indexer drained");
        Ok(accumulated)
    }
}

#[async_trait]
impl IndexerApi for IndexerClient {
    async fn fetch(
        &self,
        kind: EventKind,
        chain_id: u64,
        pair: &PoolPair,
        from_block: u64,
    ) -> Result<EventPage> {
        match kind {
            EventKind::Deposits => {
                let events: Vec<DepositEvent> =
                    self.drain("deposits", chain_id, pair, from_block).await?;
                Ok(EventPage::Deposits(events))
            }
            EventKind::Withdrawals => {
                let events: Vec<WithdrawalEvent> = self
                    .drain("withdrawals", chain_id, pair, from_block)
                    .await?;
                Ok(EventPage::Withdrawals(events))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_decodes_with_and_without_continuation() {
        let body = r#"{"events":[{"leaf_index":0,"commitment":"0xc0","timestamp":1,"transaction_hash":"0xt0","block_number":10}],"next_from":11}"#;
        let page: Page<DepositEvent> = serde_json::from_str(body).unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.next_from, Some(11));

        let terminal = r#"{"events":[]}"#;
        let page: Page<DepositEvent> = serde_json::from_str(terminal).unwrap();
        assert!(page.events.is_empty());
        assert_eq!(page.next_from, None);
    }

    #[test]
    fn withdrawal_page_decodes() {
        let body = r#"{"events":[{"nullifier_hex":"0xn0","to":"0xa","fee":"0","transaction_hash":"0xt","block_number":5}]}"#;
        let page: Page<WithdrawalEvent> = serde_json::from_str(body).unwrap();
        assert_eq!(page.events[0].nullifier_hex, "0xn0");
    }
}

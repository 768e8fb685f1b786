use sable_common::InstanceKey;
use thiserror::Error;

use crate::store::EventKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Both the indexer and the chain-scan fallback failed.
    #[error("fetching {kind} events for {instance} failed: {detail}")]
    EventsFetchFailed {
        kind: EventKind,
        instance: InstanceKey,
        detail: String,
    },

    /// The indexer answered with something other than a valid event page.
    #[error("indexer response malformed: {0}")]
    MalformedResponse(String),

    /// A chain-scan collaborator failed past the retry budget.
    #[error("chain scan failed: {0}")]
    ScanFailed(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decoding event payload failed: {0}")]
    Codec(#[from] serde_json::Error),
}

//! Pool event indexing: per-instance event store, remote indexer client,
//! and a direct chain-scan fallback.
//!
//! Each pool instance (network + pair) gets an independent event set and
//! block cursor. The fetch layer prefers the remote indexer and falls back
//! to scanning logs directly when the indexer stays unreachable.

mod error;
mod fetch;
mod indexer;
mod scan;
mod store;

pub use error::{Error, Result};
pub use fetch::EventFetcher;
pub use indexer::{IndexerApi, IndexerClient};
pub use scan::{ChainScanner, MAX_SCAN_ATTEMPTS, SCAN_WINDOW_BLOCKS};
pub use store::{DepositEvent, EventKind, EventPage, EventStore, WithdrawalEvent};

//! Direct chain-scan fallback.
//!
//! When the indexer is unreachable, event logs are read straight from an
//! RPC node in bounded block windows. The window shrinks on failure so a
//! range that keeps timing out eventually fits inside the node's limits.

use async_trait::async_trait;
use tracing::{debug, warn};

use sable_common::PoolPair;

use crate::store::{DepositEvent, EventKind, EventPage, WithdrawalEvent};
use crate::{Error, Result};

/// Blocks covered by one log query.
pub const SCAN_WINDOW_BLOCKS: u64 = 1_000_000;

/// Total query attempts before the scan is abandoned.
pub const MAX_SCAN_ATTEMPTS: u32 = 20;

/// RPC-side collaborator that reads pool logs for one block range.
///
/// Injected so the scan loop is testable without a node; a production
/// implementation filters on the pool contract and the deposit/withdrawal
/// event topics.
#[async_trait]
pub trait ChainScanner: Send + Sync {
    async fn latest_block(&self, chain_id: u64) -> Result<u64>;

    async fn scan_deposits(
        &self,
        chain_id: u64,
        pair: &PoolPair,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DepositEvent>>;

    async fn scan_withdrawals(
        &self,
        chain_id: u64,
        pair: &PoolPair,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<WithdrawalEvent>>;
}

/// Scan all events of `kind` from `from_block` to the chain tip.
///
/// Walks forward in [`SCAN_WINDOW_BLOCKS`] windows; a failed window halves
/// the width and retries the same start. Only failed queries count against
/// [`MAX_SCAN_ATTEMPTS`], so a long healthy scan never runs out of budget.
pub(crate) async fn scan_to_tip<C: ChainScanner + ?Sized>(
    scanner: &C,
    kind: EventKind,
    chain_id: u64,
    pair: &PoolPair,
    from_block: u64,
) -> Result<EventPage> {
    let tip = scanner.latest_block(chain_id).await?;

    let mut deposits = Vec::new();
    let mut withdrawals = Vec::new();
    let mut from = from_block;
    let mut window = SCAN_WINDOW_BLOCKS;
    let mut failures = 0u32;

    while from <= tip {
        let to = tip.min(from + window - 1);

        let outcome = match kind {
            EventKind::Deposits => scanner
                .scan_deposits(chain_id, pair, from, to)
                .await
                .map(|events| deposits.extend(events)),
            EventKind::Withdrawals => scanner
                .scan_withdrawals(chain_id, pair, from, to)
                .await
                .map(|events| withdrawals.extend(events)),
        };

        match outcome {
            Ok(()) => {
                debug!(%kind, chain_id, %pair, from, to, "scan window complete");
                from = to + 1;
            }
            Err(e) => {
                failures += 1;
                warn!(%kind, chain_id, %pair, from, to, failures, error = %e, "scan window failed");
                if failures >= MAX_SCAN_ATTEMPTS {
                    return Err(Error::ScanFailed(format!(
                        "{kind} scan exhausted {MAX_SCAN_ATTEMPTS} failed attempts at block {from}"
                    )));
                }
                window = (window / 2).max(1);
            }
        }
    }

    Ok(match kind {
        EventKind::Deposits => EventPage::Deposits(deposits),
        EventKind::Withdrawals => EventPage::Withdrawals(withdrawals),
    })
}

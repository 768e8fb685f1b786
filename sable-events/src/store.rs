//! In-memory event cache, keyed per pool instance.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use sable_common::InstanceKey;

/// Which event stream an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Deposits,
    Withdrawals,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::Deposits => "deposit",
            EventKind::Withdrawals => "withdrawal",
        })
    }
}

/// One `Deposit` log from a pool contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepositEvent {
    /// Position of the commitment in the on-chain tree. Assigned by the
    /// contract, dense from 0.
    pub leaf_index: u64,
    /// 0x-prefixed 32-byte commitment hex.
    pub commitment: String,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub block_number: u64,
}

/// One `Withdrawal` log from a pool contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    /// 0x-prefixed nullifier hash published by the withdrawal.
    pub nullifier_hex: String,
    pub to: String,
    pub fee: String,
    pub transaction_hash: String,
    pub block_number: u64,
}

/// A homogeneous batch of fetched events.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPage {
    Deposits(Vec<DepositEvent>),
    Withdrawals(Vec<WithdrawalEvent>),
}

impl EventPage {
    pub fn len(&self) -> usize {
        match self {
            EventPage::Deposits(events) => events.len(),
            EventPage::Withdrawals(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest block number carried by the page, if any.
    pub fn last_block(&self) -> Option<u64> {
        match self {
            EventPage::Deposits(events) => events.iter().map(|e| e.block_number).max(),
            EventPage::Withdrawals(events) => events.iter().map(|e| e.block_number).max(),
        }
    }
}

#[derive(Default)]
struct InstanceEvents {
    deposits: BTreeMap<u64, DepositEvent>,
    commitment_to_leaf: HashMap<String, u64>,
    withdrawals: HashMap<String, WithdrawalEvent>,
    deposit_cursor: u64,
    withdrawal_cursor: u64,
}

/// Per-instance deposit/withdrawal events plus fetch cursors.
///
/// Deposits are keyed by leaf index so iteration yields tree order;
/// withdrawals are a nullifier-keyed set. Spent-state answers are only as
/// fresh as the last withdrawal fetch.
#[derive(Default)]
pub struct EventStore {
    instances: HashMap<InstanceKey, InstanceEvents>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch cursor for one event stream; a never-seen instance reads 0 and
    /// is provisioned on first access.
    pub fn last_queried_block(&mut self, kind: EventKind, key: &InstanceKey) -> u64 {
        let instance = self.instances.entry(key.clone()).or_default();
        match kind {
            EventKind::Deposits => instance.deposit_cursor,
            EventKind::Withdrawals => instance.withdrawal_cursor,
        }
    }

    pub fn set_last_queried_block(&mut self, kind: EventKind, key: &InstanceKey, block: u64) {
        let instance = self.instances.entry(key.clone()).or_default();
        match kind {
            EventKind::Deposits => instance.deposit_cursor = block,
            EventKind::Withdrawals => instance.withdrawal_cursor = block,
        }
        debug!(%kind, instance = %key, block, "event cursor advanced");
    }

    /// Merge a fetched page into the instance's event set.
    ///
    /// Events are keyed (leaf index / nullifier), so re-fetching an
    /// overlapping block range is harmless.
    pub fn append(&mut self, key: &InstanceKey, page: EventPage) {
        let count = page.len();
        let instance = self.instances.entry(key.clone()).or_default();
        match page {
            EventPage::Deposits(events) => {
                for event in events {
                    instance
                        .commitment_to_leaf
                        .insert(event.commitment.clone(), event.leaf_index);
                    instance.deposits.insert(event.leaf_index, event);
                }
            }
            EventPage::Withdrawals(events) => {
                for event in events {
                    instance.withdrawals.insert(event.nullifier_hex.clone(), event);
                }
            }
        }
        debug!(instance = %key, count, "events appended");
    }

    pub fn deposit_by_commitment(
        &self,
        key: &InstanceKey,
        commitment: &str,
    ) -> Option<&DepositEvent> {
        let instance = self.instances.get(key)?;
        let leaf = instance.commitment_to_leaf.get(commitment)?;
        instance.deposits.get(leaf)
    }

    /// Highest indexed leaf, `None` when no deposits are cached.
    pub fn last_leaf_index(&self, key: &InstanceKey) -> Option<u64> {
        self.instances
            .get(key)?
            .deposits
            .keys()
            .next_back()
            .copied()
    }

    /// How many deposits the instance has seen after this commitment.
    ///
    /// `None` when the commitment itself is not indexed.
    pub fn subsequent_deposit_count(&self, key: &InstanceKey, commitment: &str) -> Option<u64> {
        let this = self.deposit_by_commitment(key, commitment)?.leaf_index;
        let last = self.last_leaf_index(key)?;
        Some(last.saturating_sub(this))
    }

    /// Whether a withdrawal for this nullifier has been indexed.
    ///
    /// Eventually consistent: `false` may mean "not yet fetched".
    pub fn is_spent(&self, key: &InstanceKey, nullifier_hex: &str) -> bool {
        self.instances
            .get(key)
            .map(|instance| instance.withdrawals.contains_key(nullifier_hex))
            .unwrap_or(false)
    }

    /// All cached commitments in leaf order, for tree (re)builds.
    pub fn leaves_ordered(&self, key: &InstanceKey) -> Vec<String> {
        self.instances
            .get(key)
            .map(|instance| {
                instance
                    .deposits
                    .values()
                    .map(|event| event.commitment.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

//! Persisted deposit records and per-network sub-state.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use sable_common::{Network, PoolPair};

/// On-chain lifecycle of a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositStatus {
    /// Submitting transaction is in flight.
    Pending,
    /// The commitment was observed on chain or the transaction confirmed.
    Confirmed,
    /// The submitting transaction failed; the slot may be reused after the
    /// record is dropped.
    Failed,
}

/// One derived note and its lifecycle metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    /// Opaque record id.
    pub id: String,
    pub pair: PoolPair,
    /// Derivation index, unique within `(network, pair)` and strictly
    /// increasing with derivation order.
    pub deposit_index: u32,
    /// Hex-encoded 62-byte note preimage.
    pub note_hex: String,
    /// Hex-encoded nullifier hash, used for spent checks.
    pub nullifier_hex: String,
    /// `None` means spent-state is unknown (degraded lookup).
    pub spent: Option<bool>,
    /// Account the deposit was sent from, for same-account-withdrawal
    /// warnings.
    pub deposit_address: Option<String>,
    /// Unix seconds of the last state change.
    pub timestamp: u64,
    pub status: DepositStatus,
    pub chain_id: u64,
}

impl Deposit {
    /// Generate an opaque record id.
    pub fn generate_id() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Current unix timestamp in seconds.
    pub fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Deposit sub-state for one network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDeposits {
    pub deposits: Vec<Deposit>,
    pub is_loading: bool,
    pub is_initialized: bool,
    pub errors_initializing: Vec<String>,
}

/// Full decrypted vault payload: one sub-state per network plus the global
/// import marker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositVaultState {
    pub networks: BTreeMap<Network, NetworkDeposits>,
    pub is_imported: bool,
}

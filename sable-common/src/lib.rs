//! Shared types for the sable privacy-pool engine.
//!
//! This crate defines the closed set of supported networks and pool pairs,
//! the static pool-instance and derivation-path tables, and small hex
//! helpers shared by the vault, event, tree, and note crates.

mod hexutil;
mod instances;
mod network;
mod pair;

pub use hexutil::{decode_hex, encode_hex32_padded, encode_hex_prefixed};
pub use instances::{
    derivation_pair_index, pool_instance, pool_instances, InstanceKey, PoolInstance,
    DERIVATION_TABLE_VERSION,
};
pub use network::{Network, NetworkIntervals, DEFAULT_DERIVATIONS_FORWARD};
pub use pair::{Currency, PoolPair};

use thiserror::Error;

/// Result type alias for common-table lookups.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the shared tables and helpers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The chain id does not resolve to a supported network.
    #[error("unsupported network: chain id {0}")]
    UnsupportedNetwork(u64),

    /// The (currency, amount) pair has no entry in the instance or
    /// derivation tables.
    #[error("unsupported pool pair: {0}")]
    UnsupportedPair(String),

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Event log topic for pool `Deposit(bytes32,uint32,uint256)` events.
pub const DEPOSIT_EVENT_TOPIC: &str =
    "0xa945e51eec50ab98c161376f0db4cf2aeba3ec92755fe2fcd388bdbbb80ff196";

/// Event log topic for pool `Withdrawal(address,bytes32,address,uint256)` events.
pub const WITHDRAWAL_EVENT_TOPIC: &str =
    "0xe9e508bad6d4c3227e881ca19068f099da81b5164dd6d62b2eaf1e8bc6c34931";

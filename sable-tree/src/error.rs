use sable_common::InstanceKey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The cache holds no tree for this instance yet.
    #[error("merkle tree not initialized for {0}")]
    TreeNotInitialized(InstanceKey),

    /// A proof was requested for a leaf the tree does not contain.
    #[error("leaf index {index} out of range (tree has {leaf_count} leaves)")]
    LeafOutOfRange { index: u64, leaf_count: u64 },

    /// A leaf value was not valid 32-byte hex.
    #[error("invalid leaf encoding: {0}")]
    InvalidLeaf(String),

    /// The tree is at capacity for its fixed height.
    #[error("merkle tree full: capacity 2^{0}")]
    TreeFull(usize),

    /// Even a forced rebuild from the full event set produced a root the
    /// chain does not recognize.
    #[error("merkle tree for {0} does not match on-chain state")]
    CorruptedTree(InstanceKey),

    /// The on-chain root check itself failed.
    #[error("root verification failed: {0}")]
    RootCheck(String),
}

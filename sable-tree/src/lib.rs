//! Per-instance Merkle trees over deposit commitments.
//!
//! Each pool instance maintains a fixed-height tree whose leaves are the
//! indexed commitments in leaf order. Proofs are only handed out after the
//! computed root passes the on-chain known-root check; a stale or corrupted
//! cached tree is rebuilt once from the full leaf set before giving up.

mod cache;
mod error;
mod hasher;
mod tree;
mod verify;

pub use cache::MerkleTreeCache;
pub use error::{Error, Result};
pub use hasher::{Blake2TreeHasher, TreeHasher};
pub use tree::{MerkleProof, MerkleTree, TREE_HEIGHT};
pub use verify::{verified_proof, RootVerifier};

//! Node-hash capability for the tree.

use blake2b_simd::Params as Blake2bParams;

use sable_common::decode_hex;

use crate::{Error, Result};

/// Pair hash used for interior tree nodes.
///
/// Production binds the circuit-compatible hash; tests and the default
/// build use [`Blake2TreeHasher`]. Implementations must be pure.
pub trait TreeHasher: Send + Sync + 'static {
    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32];
}

const NODE_PERSONAL: &[u8; 16] = b"sable_tree_node0";

/// BLAKE2b-256 pair hash with a domain-separating personalization.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake2TreeHasher;

impl TreeHasher for Blake2TreeHasher {
    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let digest = Blake2bParams::new()
            .hash_length(32)
            .personal(NODE_PERSONAL)
            .to_state()
            .update(left)
            .update(right)
            .finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(digest.as_bytes());
        out
    }
}

/// Decode a hex-encoded commitment into a 32-byte leaf.
pub(crate) fn decode_leaf(value: &str) -> Result<[u8; 32]> {
    let bytes = decode_hex(value).map_err(|_| Error::InvalidLeaf(value.to_string()))?;
    if bytes.len() != 32 {
        return Err(Error::InvalidLeaf(value.to_string()));
    }
    let mut leaf = [0u8; 32];
    leaf.copy_from_slice(&bytes);
    Ok(leaf)
}

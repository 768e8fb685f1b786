//! Fixed-height sparse Merkle tree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sable_common::encode_hex_prefixed;

use crate::hasher::{decode_leaf, TreeHasher};
use crate::{Error, Result};

/// Tree height fixed by the pool circuit; capacity 2^20 leaves.
pub const TREE_HEIGHT: usize = 20;

/// Inclusion proof for one leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Root the proof verifies against, 0x-prefixed hex.
    pub root: String,
    /// Sibling hashes, leaf level first.
    pub path_elements: Vec<String>,
    /// 0 = node is a left child, 1 = right child, leaf level first.
    pub path_indices: Vec<u8>,
}

/// Merkle tree over one instance's commitments.
///
/// Occupied nodes are stored per level; absent siblings fall back to the
/// precomputed zero subtree for that level, so a mostly-empty tree costs
/// memory proportional to its leaf count.
pub struct MerkleTree {
    hasher: Arc<dyn TreeHasher>,
    /// `levels[0]` are the leaves; `levels[TREE_HEIGHT]` holds the root.
    levels: Vec<Vec<[u8; 32]>>,
    /// Empty-subtree hash per level.
    zeros: Vec<[u8; 32]>,
}

impl MerkleTree {
    pub fn new(hasher: Arc<dyn TreeHasher>) -> Self {
        let mut zeros = Vec::with_capacity(TREE_HEIGHT + 1);
        zeros.push([0u8; 32]);
        for level in 0..TREE_HEIGHT {
            let below = zeros[level];
            zeros.push(hasher.hash_pair(&below, &below));
        }
        Self {
            hasher,
            levels: vec![Vec::new(); TREE_HEIGHT + 1],
            zeros,
        }
    }

    pub fn leaf_count(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// Replace the whole leaf set and recompute.
    pub fn rebuild(&mut self, leaves: &[String]) -> Result<()> {
        let decoded = leaves
            .iter()
            .map(|leaf| decode_leaf(leaf))
            .collect::<Result<Vec<_>>>()?;
        if decoded.len() > 1 << TREE_HEIGHT {
            return Err(Error::TreeFull(TREE_HEIGHT));
        }
        self.levels[0] = decoded;
        self.recompute();
        Ok(())
    }

    /// Append leaves the tree has not seen and recompute.
    pub fn append(&mut self, leaves: &[String]) -> Result<()> {
        if leaves.is_empty() {
            return Ok(());
        }
        let decoded = leaves
            .iter()
            .map(|leaf| decode_leaf(leaf))
            .collect::<Result<Vec<_>>>()?;
        if self.levels[0].len() + decoded.len() > 1 << TREE_HEIGHT {
            return Err(Error::TreeFull(TREE_HEIGHT));
        }
        self.levels[0].extend(decoded);
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        for level in 0..TREE_HEIGHT {
            let width = (self.levels[level].len() + 1) / 2;
            let mut above = Vec::with_capacity(width);
            for pair in 0..width {
                let left = self.levels[level][2 * pair];
                let right = self
                    .levels[level]
                    .get(2 * pair + 1)
                    .copied()
                    .unwrap_or(self.zeros[level]);
                above.push(self.hasher.hash_pair(&left, &right));
            }
            self.levels[level + 1] = above;
        }
    }

    /// Current root, 0x-prefixed hex. An empty tree has the all-zero
    /// subtree root.
    pub fn root(&self) -> String {
        let root = self.levels[TREE_HEIGHT]
            .first()
            .copied()
            .unwrap_or(self.zeros[TREE_HEIGHT]);
        encode_hex_prefixed(&root)
    }

    /// Inclusion proof for the leaf at `leaf_index`.
    pub fn proof(&self, leaf_index: u64) -> Result<MerkleProof> {
        if leaf_index >= self.leaf_count() {
            return Err(Error::LeafOutOfRange {
                index: leaf_index,
                leaf_count: self.leaf_count(),
            });
        }
        let mut path_elements = Vec::with_capacity(TREE_HEIGHT);
        let mut path_indices = Vec::with_capacity(TREE_HEIGHT);
        let mut index = leaf_index as usize;
        for level in 0..TREE_HEIGHT {
            let sibling = self.levels[level]
                .get(index ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            path_elements.push(encode_hex_prefixed(&sibling));
            path_indices.push((index & 1) as u8);
            index >>= 1;
        }
        Ok(MerkleProof {
            root: self.root(),
            path_elements,
            path_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake2TreeHasher;

    fn leaf(value: u8) -> String {
        encode_hex_prefixed(&[value; 32])
    }

    fn tree() -> MerkleTree {
        MerkleTree::new(Arc::new(Blake2TreeHasher))
    }

    /// Walk a proof back up to its root.
    fn fold(proof: &MerkleProof, leaf: &str) -> String {
        let hasher = Blake2TreeHasher;
        let mut node = decode_leaf(leaf).unwrap();
        for (sibling, side) in proof.path_elements.iter().zip(&proof.path_indices) {
            let sibling = decode_leaf(sibling).unwrap();
            node = if *side == 0 {
                hasher.hash_pair(&node, &sibling)
            } else {
                hasher.hash_pair(&sibling, &node)
            };
        }
        encode_hex_prefixed(&node)
    }

    #[test]
    fn empty_tree_has_zero_subtree_root() {
        let tree = tree();
        assert_eq!(tree.leaf_count(), 0);
        assert_ne!(tree.root(), encode_hex_prefixed(&[0u8; 32]));
    }

    #[test]
    fn proofs_fold_back_to_the_root() {
        let mut tree = tree();
        let leaves: Vec<String> = (1..=5).map(leaf).collect();
        tree.rebuild(&leaves).unwrap();

        for (index, value) in leaves.iter().enumerate() {
            let proof = tree.proof(index as u64).unwrap();
            assert_eq!(proof.path_elements.len(), TREE_HEIGHT);
            assert_eq!(fold(&proof, value), tree.root());
        }
    }

    #[test]
    fn append_matches_full_rebuild() {
        let leaves: Vec<String> = (1..=6).map(leaf).collect();

        let mut rebuilt = tree();
        rebuilt.rebuild(&leaves).unwrap();

        let mut appended = tree();
        appended.rebuild(&leaves[..3]).unwrap();
        appended.append(&leaves[3..]).unwrap();

        assert_eq!(rebuilt.root(), appended.root());
    }

    #[test]
    fn out_of_range_proof_rejected() {
        let mut tree = tree();
        tree.rebuild(&[leaf(1)]).unwrap();
        assert!(matches!(
            tree.proof(1),
            Err(Error::LeafOutOfRange {
                index: 1,
                leaf_count: 1
            })
        ));
    }

    #[test]
    fn malformed_leaf_rejected() {
        let mut tree = tree();
        assert!(matches!(
            tree.rebuild(&["0xshort".to_string()]),
            Err(Error::InvalidLeaf(_))
        ));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let leaves: Vec<String> = (1..=4).map(leaf).collect();
        let mut tree = tree();
        tree.rebuild(&leaves).unwrap();
        let first = tree.root();
        tree.rebuild(&leaves).unwrap();
        assert_eq!(tree.root(), first);
    }
}

//! Per-instance tree cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use sable_common::InstanceKey;

use crate::hasher::TreeHasher;
use crate::tree::{MerkleProof, MerkleTree};
use crate::{Error, Result};

/// One [`MerkleTree`] per pool instance, all sharing a hasher.
pub struct MerkleTreeCache {
    hasher: Arc<dyn TreeHasher>,
    trees: HashMap<InstanceKey, MerkleTree>,
}

impl MerkleTreeCache {
    pub fn new(hasher: Arc<dyn TreeHasher>) -> Self {
        Self {
            hasher,
            trees: HashMap::new(),
        }
    }

    /// Bring the instance's tree up to date.
    ///
    /// An absent tree, or `force = true`, rebuilds from `leaves` as the
    /// full set. Otherwise `leaves` are treated as the append delta; the
    /// caller passes only commitments the tree has not seen.
    pub fn update(&mut self, key: &InstanceKey, leaves: &[String], force: bool) -> Result<()> {
        match self.trees.get_mut(key) {
            Some(tree) if !force => {
                tree.append(leaves)?;
                debug!(instance = %key, appended = leaves.len(), "tree appended");
            }
            existing => {
                let rebuilt = existing.is_some();
                let mut tree = MerkleTree::new(self.hasher.clone());
                tree.rebuild(leaves)?;
                self.trees.insert(key.clone(), tree);
                debug!(instance = %key, leaves = leaves.len(), rebuilt, "tree built");
            }
        }
        Ok(())
    }

    pub fn root(&self, key: &InstanceKey) -> Result<String> {
        Ok(self.tree(key)?.root())
    }

    pub fn proof(&self, key: &InstanceKey, leaf_index: u64) -> Result<MerkleProof> {
        self.tree(key)?.proof(leaf_index)
    }

    fn tree(&self, key: &InstanceKey) -> Result<&MerkleTree> {
        self.trees
            .get(key)
            .ok_or_else(|| Error::TreeNotInitialized(key.clone()))
    }
}

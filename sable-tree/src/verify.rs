//! Root-validity handshake against the chain.

use async_trait::async_trait;
use tracing::{info, warn};

use sable_common::InstanceKey;

use crate::cache::MerkleTreeCache;
use crate::tree::MerkleProof;
use crate::{Error, Result};

/// Asks the pool contract whether it recognizes a root.
///
/// Contracts keep a ring buffer of recent roots, so a locally correct root
/// can still be unknown when the local tree lags or leads the chain.
#[async_trait]
pub trait RootVerifier: Send + Sync {
    async fn is_known_root(&self, key: &InstanceKey, root: &str) -> Result<bool>;
}

/// Produce a proof whose root the chain recognizes.
///
/// On an unknown root the cached tree is assumed stale and rebuilt once
/// from `full_leaves` (the instance's complete ordered commitment set); a
/// second unknown root means local and on-chain history genuinely disagree
/// and surfaces as [`Error::CorruptedTree`].
pub async fn verified_proof<V: RootVerifier + ?Sized>(
    cache: &mut MerkleTreeCache,
    verifier: &V,
    key: &InstanceKey,
    leaf_index: u64,
    full_leaves: &[String],
) -> Result<MerkleProof> {
    let proof = cache.proof(key, leaf_index)?;
    if verifier.is_known_root(key, &proof.root).await? {
        return Ok(proof);
    }

    warn!(instance = %key, root = %proof.root, "root unknown on chain, forcing rebuild");
    cache.update(key, full_leaves, true)?;
    let proof = cache.proof(key, leaf_index)?;
    if verifier.is_known_root(key, &proof.root).await? {
        info!(instance = %key, "rebuilt tree root accepted");
        return Ok(proof);
    }
    Err(Error::CorruptedTree(key.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake2TreeHasher;
    use sable_common::{encode_hex_prefixed, Currency, Network, PoolPair};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn key() -> InstanceKey {
        InstanceKey::new(Network::Goerli, PoolPair::new(Currency::Eth, "1"))
    }

    fn leaf(value: u8) -> String {
        encode_hex_prefixed(&[value; 32])
    }

    /// Accepts exactly the roots in `known`.
    struct FixedVerifier {
        known: Mutex<Vec<String>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RootVerifier for FixedVerifier {
        async fn is_known_root(&self, _key: &InstanceKey, root: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.known.lock().unwrap().iter().any(|r| r == root))
        }
    }

    fn expected_root(leaves: &[String]) -> String {
        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));
        cache.update(&key(), leaves, false).unwrap();
        cache.root(&key()).unwrap()
    }

    #[tokio::test]
    async fn known_root_passes_first_try() {
        let leaves = vec![leaf(1), leaf(2)];
        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));
        cache.update(&key(), &leaves, false).unwrap();
        let verifier = FixedVerifier {
            known: Mutex::new(vec![expected_root(&leaves)]),
            calls: AtomicU32::new(0),
        };

        let proof = verified_proof(&mut cache, &verifier, &key(), 0, &leaves)
            .await
            .unwrap();
        assert_eq!(proof.root, expected_root(&leaves));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_tree_is_rebuilt_once() {
        // Cache was built before leaf 3 landed on chain.
        let stale = vec![leaf(1), leaf(2)];
        let current = vec![leaf(1), leaf(2), leaf(3)];
        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));
        cache.update(&key(), &stale, false).unwrap();

        let verifier = FixedVerifier {
            known: Mutex::new(vec![expected_root(&current)]),
            calls: AtomicU32::new(0),
        };
        let proof = verified_proof(&mut cache, &verifier, &key(), 0, &current)
            .await
            .unwrap();
        assert_eq!(proof.root, expected_root(&current));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_mismatch_is_corrupted_tree() {
        let leaves = vec![leaf(1)];
        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));
        cache.update(&key(), &leaves, false).unwrap();

        let verifier = FixedVerifier {
            known: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        };
        let result = verified_proof(&mut cache, &verifier, &key(), 0, &leaves).await;
        assert!(matches!(result, Err(Error::CorruptedTree(_))));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
    }
}

//! Withdrawal proof-input assembly.
//!
//! Recomputes the commitment from the raw note, locates its leaf in the
//! event record, obtains a chain-verified Merkle proof, and hands the
//! assembled witness to the prover. Stops at the witness boundary; the
//! circuit itself is an injected capability.

use tracing::debug;

use sable_common::{decode_hex, encode_hex32_padded, InstanceKey, Network, PoolPair};
use sable_crypto::{ProofData, ProofWitness, WorkerHandle};
use sable_events::EventStore;
use sable_tree::{verified_proof, MerkleTreeCache, RootVerifier};

use crate::deriver::NOTE_PREIMAGE_LEN;
use crate::{Error, Result};

/// Caller-supplied parameters for one withdrawal.
#[derive(Clone, Debug)]
pub struct WithdrawRequest {
    /// 0x-prefixed 62-byte note preimage.
    pub note_hex: String,
    pub pair: PoolPair,
    pub chain_id: u64,
    pub recipient: String,
    /// Zero address when withdrawing without a relayer.
    pub relayer: String,
    /// Relayer fee in wei, decimal string.
    pub fee: String,
}

/// Assemble and prove the withdrawal witness for `request`.
pub async fn prepare_withdrawal<V: RootVerifier + ?Sized>(
    crypto: &WorkerHandle,
    store: &EventStore,
    cache: &mut MerkleTreeCache,
    verifier: &V,
    request: &WithdrawRequest,
) -> Result<ProofData> {
    let network = Network::from_chain_id(request.chain_id)?;
    let key = InstanceKey::new(network, request.pair.clone());

    let preimage = decode_hex(&request.note_hex)?;
    if preimage.len() != NOTE_PREIMAGE_LEN {
        return Err(Error::MalformedNote(format!(
            "expected {NOTE_PREIMAGE_LEN} bytes, got {}",
            preimage.len()
        )));
    }
    let nullifier = preimage[..NOTE_PREIMAGE_LEN / 2].to_vec();

    let commitment = encode_hex32_padded(&crypto.pedersen_hash(preimage).await?);
    let nullifier_hash = encode_hex32_padded(&crypto.pedersen_hash(nullifier).await?);

    let leaf_index = store
        .deposit_by_commitment(&key, &commitment)
        .map(|event| event.leaf_index)
        .ok_or_else(|| Error::NoteNotDeposited(commitment.clone()))?;

    let leaves = store.leaves_ordered(&key);
    if cache.root(&key).is_err() {
        cache.update(&key, &leaves, true)?;
    }
    let proof = verified_proof(cache, verifier, &key, leaf_index, &leaves).await?;
    debug!(instance = %key, leaf_index, root = %proof.root, "withdrawal proof path verified");

    let witness = ProofWitness {
        root: proof.root,
        nullifier_hash,
        recipient: request.recipient.clone(),
        relayer: request.relayer.clone(),
        fee: request.fee.clone(),
        note_preimage: request.note_hex.clone(),
        path_elements: proof.path_elements,
        path_indices: proof.path_indices,
    };
    Ok(crypto.prove(witness).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sable_common::Currency;
    use sable_crypto::{spawn_worker, Blake2Provider};
    use sable_events::{DepositEvent, EventPage};
    use sable_tree::Blake2TreeHasher;
    use std::sync::Arc;

    struct AcceptAll;

    #[async_trait]
    impl RootVerifier for AcceptAll {
        async fn is_known_root(
            &self,
            _key: &InstanceKey,
            _root: &str,
        ) -> sable_tree::Result<bool> {
            Ok(true)
        }
    }

    fn request(note_hex: String) -> WithdrawRequest {
        WithdrawRequest {
            note_hex,
            pair: PoolPair::new(Currency::Eth, "1"),
            chain_id: 5,
            recipient: "0x000000000000000000000000000000000000beef".into(),
            relayer: "0x0000000000000000000000000000000000000000".into(),
            fee: "0".into(),
        }
    }

    #[tokio::test]
    async fn proves_a_deposited_note() {
        let crypto = spawn_worker(Blake2Provider);
        let note_bytes = vec![7u8; NOTE_PREIMAGE_LEN];
        let note_hex = sable_common::encode_hex_prefixed(&note_bytes);
        let commitment =
            encode_hex32_padded(&crypto.pedersen_hash(note_bytes.clone()).await.unwrap());

        let mut store = EventStore::new();
        let key = InstanceKey::new(Network::Goerli, PoolPair::new(Currency::Eth, "1"));
        store.append(
            &key,
            EventPage::Deposits(vec![DepositEvent {
                leaf_index: 0,
                commitment,
                timestamp: 1,
                transaction_hash: "0xt".into(),
                block_number: 1,
            }]),
        );

        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));
        let proof = prepare_withdrawal(&crypto, &store, &mut cache, &AcceptAll, &request(note_hex))
            .await
            .unwrap();
        assert!(!proof.proof.is_empty());
        assert_eq!(proof.public_signals.len(), 5);
    }

    #[tokio::test]
    async fn undeposited_note_is_rejected() {
        let crypto = spawn_worker(Blake2Provider);
        let note_hex = sable_common::encode_hex_prefixed(&vec![9u8; NOTE_PREIMAGE_LEN]);
        let store = EventStore::new();
        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));

        let result =
            prepare_withdrawal(&crypto, &store, &mut cache, &AcceptAll, &request(note_hex)).await;
        assert!(matches!(result, Err(Error::NoteNotDeposited(_))));
    }

    #[tokio::test]
    async fn truncated_note_is_rejected() {
        let crypto = spawn_worker(Blake2Provider);
        let store = EventStore::new();
        let mut cache = MerkleTreeCache::new(Arc::new(Blake2TreeHasher));

        let result = prepare_withdrawal(
            &crypto,
            &store,
            &mut cache,
            &AcceptAll,
            &request("0xabcd".into()),
        )
        .await;
        assert!(matches!(result, Err(Error::MalformedNote(_))));
    }
}

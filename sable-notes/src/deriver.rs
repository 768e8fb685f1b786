//! Deterministic note derivation from a bip39 seed.
//!
//! Derivation never consults any stored state: the same seed, chain id,
//! pair, and index always reproduce the same note bytes, which is what
//! makes seed-only recovery possible.

use bip39::{Language, Mnemonic};
use hkdf::Hkdf;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use sable_common::{
    derivation_pair_index, encode_hex32_padded, encode_hex_prefixed, PoolPair,
};
use sable_crypto::WorkerHandle;

use crate::{Error, Result};

/// Byte widths fixed by the note format.
const NULLIFIER_LEN: usize = 31;
const SECRET_LEN: usize = 31;
pub(crate) const NOTE_PREIMAGE_LEN: usize = NULLIFIER_LEN + SECRET_LEN;

/// One derived note, before it is tied to any on-chain state.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteCandidate {
    pub deposit_index: u32,
    pub chain_id: u64,
    pub pair: PoolPair,
    /// 0x-prefixed 62-byte note preimage (nullifier || secret).
    pub note_hex: String,
    /// 0x-prefixed 32-byte commitment, as emitted by the pool contract.
    pub commitment_hex: String,
    /// 0x-prefixed 32-byte nullifier hash, as published on withdrawal.
    pub nullifier_hash_hex: String,
}

/// Derives notes from an in-memory seed via the crypto worker.
pub struct NoteDeriver {
    crypto: WorkerHandle,
    root: RwLock<Option<Zeroizing<[u8; 64]>>>,
}

impl NoteDeriver {
    pub fn new(crypto: WorkerHandle) -> Self {
        Self {
            crypto,
            root: RwLock::new(None),
        }
    }

    pub async fn has_root(&self) -> bool {
        self.root.read().await.is_some()
    }

    /// Load the derivation root from a bip39 mnemonic (empty passphrase).
    pub async fn set_root_from_mnemonic(&self, phrase: &str) -> Result<()> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|e| Error::Mnemonic(e.to_string()))?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));
        *self.root.write().await = Some(seed);
        debug!("derivation root loaded");
        Ok(())
    }

    /// Drop the seed from memory.
    pub async fn clear_root(&self) {
        *self.root.write().await = None;
        debug!("derivation root cleared");
    }

    /// Path-indexed child key: HKDF-SHA256 over the seed, with the
    /// derivation path as the info string.
    async fn child_key(&self, index: u32, chain_id: u64, pair_index: u8) -> Result<Zeroizing<[u8; 32]>> {
        let root = self.root.read().await;
        let seed = root.as_ref().ok_or(Error::RootPathNotSet)?;
        let path = format!("m/44'/60'/{chain_id}'/{pair_index}'/{index}");
        let hk = Hkdf::<Sha256>::new(None, seed.as_ref());
        let mut key = Zeroizing::new([0u8; 32]);
        hk.expand(path.as_bytes(), key.as_mut())
            .map_err(|_| Error::RootPathNotSet)?;
        Ok(key)
    }

    /// Derive the note at `(chain_id, pair, index)`.
    ///
    /// Pure given the loaded seed; re-derivation is byte-identical, and any
    /// of chain id, pair slot, or index changing changes every output.
    pub async fn derive_note(
        &self,
        index: u32,
        chain_id: u64,
        pair: &PoolPair,
    ) -> Result<NoteCandidate> {
        let pair_index = derivation_pair_index(pair)?;
        let child = self.child_key(index, chain_id, pair_index).await?;
        let hashed = Zeroizing::new(self.crypto.keyed_hash64(child.to_vec()).await?);

        let nullifier = &hashed[..NULLIFIER_LEN];
        let secret = &hashed[64 - SECRET_LEN..];
        let mut preimage = Zeroizing::new([0u8; NOTE_PREIMAGE_LEN]);
        preimage[..NULLIFIER_LEN].copy_from_slice(nullifier);
        preimage[NULLIFIER_LEN..].copy_from_slice(secret);

        let commitment = self.crypto.pedersen_hash(preimage.to_vec()).await?;
        let nullifier_hash = self.crypto.pedersen_hash(nullifier.to_vec()).await?;

        Ok(NoteCandidate {
            deposit_index: index,
            chain_id,
            pair: pair.clone(),
            note_hex: encode_hex_prefixed(preimage.as_ref()),
            commitment_hex: encode_hex32_padded(&commitment),
            nullifier_hash_hex: encode_hex32_padded(&nullifier_hash),
        })
    }
}

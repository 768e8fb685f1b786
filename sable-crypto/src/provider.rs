//! Pure hashing/proving provider trait and the in-process test provider.

use blake2b_simd::Params as Blake2bParams;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Witness for a withdrawal proof.
///
/// Field layout mirrors the circuit's private/public input split; the
/// circuit itself is an external capability.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofWitness {
    /// Merkle root the inclusion path commits to, 0x-prefixed.
    pub root: String,
    /// Nullifier hash published on withdrawal, 0x-prefixed.
    pub nullifier_hash: String,
    /// Recipient address.
    pub recipient: String,
    /// Relayer address, zero when withdrawing directly.
    pub relayer: String,
    /// Relayer fee in wei, decimal string.
    pub fee: String,
    /// Private note preimage, 0x-prefixed 62 bytes.
    pub note_preimage: String,
    /// Sibling hashes, leaf to root.
    pub path_elements: Vec<String>,
    /// Left/right selector bits, leaf to root.
    pub path_indices: Vec<u8>,
}

/// An encoded zk-SNARK proof plus its public signals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofData {
    pub proof: Vec<u8>,
    pub public_signals: Vec<String>,
}

/// Pure cryptographic operations consumed by the engine.
///
/// Implementations must be deterministic: the recovery path depends on
/// re-deriving byte-identical commitments from the same inputs.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Keyed 64-byte hash of the input (note key expansion).
    fn keyed_hash64(&self, input: &[u8]) -> [u8; 64];

    /// Pedersen-style commitment hash of the input, 32 bytes.
    fn pedersen_hash(&self, input: &[u8]) -> [u8; 32];

    /// Produce a withdrawal proof for the witness.
    fn prove(&self, witness: &ProofWitness) -> Result<ProofData>;
}

const KEYED_HASH_PERSONAL: &[u8; 16] = b"sable_note_hash0";
const COMMITMENT_PERSONAL: &[u8; 16] = b"sable_commitment";

/// BLAKE2b-backed provider.
///
/// `keyed_hash64` is the production key-expansion hash. The commitment hash
/// and prover are deterministic stand-ins for the circuit-native primitives,
/// used by tests and non-proving tooling.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake2Provider;

impl CryptoProvider for Blake2Provider {
    fn keyed_hash64(&self, input: &[u8]) -> [u8; 64] {
        let hash = Blake2bParams::new()
            .hash_length(64)
            .personal(KEYED_HASH_PERSONAL)
            .hash(input);
        let mut out = [0u8; 64];
        out.copy_from_slice(hash.as_bytes());
        out
    }

    fn pedersen_hash(&self, input: &[u8]) -> [u8; 32] {
        let hash = Blake2bParams::new()
            .hash_length(32)
            .personal(COMMITMENT_PERSONAL)
            .hash(input);
        let mut out = [0u8; 32];
        out.copy_from_slice(hash.as_bytes());
        out
    }

    fn prove(&self, witness: &ProofWitness) -> Result<ProofData> {
        let encoded = serde_json::to_vec(witness)
            .map_err(|e| Error::InvalidInput(format!("witness encoding failed: {e}")))?;
        let digest = Blake2bParams::new().hash_length(64).hash(&encoded);
        Ok(ProofData {
            proof: digest.as_bytes().to_vec(),
            public_signals: vec![
                witness.root.clone(),
                witness.nullifier_hash.clone(),
                witness.recipient.clone(),
                witness.relayer.clone(),
                witness.fee.clone(),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_hash_is_deterministic() {
        let provider = Blake2Provider;
        assert_eq!(provider.keyed_hash64(b"abc"), provider.keyed_hash64(b"abc"));
        assert_ne!(
            provider.keyed_hash64(b"abc")[..],
            provider.keyed_hash64(b"abd")[..]
        );
    }

    #[test]
    fn commitment_domain_is_separated_from_key_expansion() {
        let provider = Blake2Provider;
        let keyed = provider.keyed_hash64(b"input");
        let commitment = provider.pedersen_hash(b"input");
        assert_ne!(&keyed[..32], &commitment[..]);
    }
}

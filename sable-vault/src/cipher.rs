//! Passphrase-based AEAD for the vault blob.
//!
//! Blob layout: `salt(16) || nonce(12) || ciphertext`. The key is an
//! Argon2id stretch of the passphrase over the per-blob salt, so re-sealing
//! the same state never reuses a (key, nonce) pair.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use blake2b_simd::Params as Blake2bParams;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{Error, Result};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Personalization for the log-correlation digest. Distinct from any key
/// derivation input so the digest can never double as key material.
const LOG_DIGEST_PERSONAL: &[u8; 16] = b"sable_vault_log0";

fn stretch_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut key = Zeroizing::new([0u8; 32]);
    argon2::Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, key.as_mut())
        .map_err(|e| Error::Cipher(format!("key stretch failed: {e}")))?;
    Ok(key)
}

/// Encrypt `plaintext` under `passphrase` with a fresh salt and nonce.
pub(crate) fn seal(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key = stretch_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| Error::Cipher(format!("cipher init failed: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| Error::Cipher(format!("encryption failed: {e}")))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a sealed blob. A wrong passphrase surfaces as
/// [`Error::InvalidPassphrase`].
pub(crate) fn open(passphrase: &str, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < SALT_LEN + NONCE_LEN {
        return Err(Error::Cipher("ciphertext blob too short".into()));
    }
    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = stretch_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| Error::Cipher(format!("cipher init failed: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| Error::InvalidPassphrase)
}

/// One-way salted digest of a passphrase, for trace correlation only.
///
/// Never used as key material and never reversible back to the phrase.
pub fn hash_for_log(passphrase: &str) -> String {
    let digest = Blake2bParams::new()
        .hash_length(16)
        .personal(LOG_DIGEST_PERSONAL)
        .hash(passphrase.as_bytes());
    hex::encode(digest.as_bytes())
}

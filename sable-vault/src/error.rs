//! Error types for vault operations.

use thiserror::Error;

/// Result type alias for vault operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The vault has no persisted ciphertext yet.
    #[error("vault is not initialized")]
    NotInitialized,

    /// `initialize` was called on a vault that already holds ciphertext.
    #[error("vault is already initialized")]
    AlreadyInitialized,

    /// The vault is initialized but no passphrase is held in memory.
    #[error("vault is locked")]
    Locked,

    /// Decryption failed during unlock; the stored ciphertext is untouched.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// The chain id does not resolve to a supported network.
    #[error("unsupported network: chain id {0}")]
    UnsupportedNetwork(u64),

    /// A referenced deposit is not present in the store.
    #[error("deposit not found: {0}")]
    DepositNotFound(String),

    /// `drop_failed_deposit` was called on a deposit that is not FAILED.
    #[error("deposit {0} is not in the failed state")]
    DepositNotFailed(String),

    /// The import producer failed; sub-state flags are left as written.
    #[error("deposit import failed: {0}")]
    ImportFailed(String),

    /// Underlying storage failure.
    #[error("vault storage error: {0}")]
    Storage(String),

    /// AEAD or key-stretching failure that is not a wrong passphrase.
    #[error("vault cipher error: {0}")]
    Cipher(String),

    /// Vault plaintext (de)serialization failure.
    #[error("vault state codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

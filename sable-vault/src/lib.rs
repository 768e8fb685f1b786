//! Encrypted vault and per-network deposit store.
//!
//! The vault persists one ciphertext blob per wallet; decrypted, the blob is
//! a typed map from network to deposit sub-state. Every mutation is a full
//! read-modify-encrypt-write under a single per-vault mutex.

mod cipher;
mod controller;
mod deposits;
mod error;
mod storage;
mod vault;

pub use cipher::hash_for_log;
pub use controller::{DepositVault, ImportOutcome};
pub use deposits::{Deposit, DepositStatus, DepositVaultState, NetworkDeposits};
pub use error::{Error, Result};
pub use storage::{FileStorage, MemoryStorage, VaultStorage};
pub use vault::EncryptedVault;

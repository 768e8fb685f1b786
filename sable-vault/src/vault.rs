//! Generic encrypted key-value vault with mutual-exclusion discipline.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::cipher::{self, hash_for_log};
use crate::storage::VaultStorage;
use crate::{Error, Result};

struct VaultInner {
    /// In-memory unlock phrase; `None` while locked.
    passphrase: Option<Zeroizing<String>>,
}

/// An encrypted container for one typed state value.
///
/// The whole state is encrypted as a unit: there is no partial decryption,
/// and every mutation is a read-modify-encrypt-write performed while the
/// vault mutex is held. Lock acquisition is an async suspension point;
/// callers queue rather than overwrite each other's reads.
pub struct EncryptedVault<T, S> {
    storage: S,
    inner: Mutex<VaultInner>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, S> EncryptedVault<T, S>
where
    T: Serialize + DeserializeOwned + Default,
    S: VaultStorage,
{
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            inner: Mutex::new(VaultInner { passphrase: None }),
            _marker: std::marker::PhantomData,
        }
    }

    /// Whether a ciphertext blob has ever been written.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(!self.storage.read_ciphertext()?.is_empty())
    }

    /// Whether an unlock phrase is currently held in memory.
    pub async fn is_unlocked(&self) -> bool {
        self.inner.lock().await.passphrase.is_some()
    }

    /// Write the default state encrypted under `passphrase`.
    ///
    /// Fails if ciphertext already exists; the vault stays locked afterward.
    pub async fn initialize(&self, passphrase: &str) -> Result<()> {
        let _guard = self.inner.lock().await;
        if !self.storage.read_ciphertext()?.is_empty() {
            return Err(Error::AlreadyInitialized);
        }
        self.write_state(passphrase, &T::default())?;
        info!(passphrase_digest = %hash_for_log(passphrase), "vault initialized");
        Ok(())
    }

    /// Unconditionally overwrite the vault with default state.
    ///
    /// Destructive: any existing deposits become unrecoverable. Callers are
    /// expected to warn the user before invoking this.
    pub async fn reinitialize(&self, passphrase: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.passphrase = None;
        self.write_state(passphrase, &T::default())?;
        info!(passphrase_digest = %hash_for_log(passphrase), "vault reinitialized");
        Ok(())
    }

    /// Discard the in-memory passphrase. Ciphertext is untouched.
    pub async fn lock(&self) {
        let mut guard = self.inner.lock().await;
        guard.passphrase = None;
        debug!("vault locked");
    }

    /// Store the passphrase and trial-decrypt.
    ///
    /// A failed decrypt re-locks and fails with `InvalidPassphrase`,
    /// leaving stored state unchanged.
    pub async fn unlock(&self, passphrase: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let blob = self.storage.read_ciphertext()?;
        if blob.is_empty() {
            return Err(Error::NotInitialized);
        }
        guard.passphrase = Some(Zeroizing::new(passphrase.to_string()));
        match cipher::open(passphrase, &blob) {
            Ok(_) => {
                debug!(passphrase_digest = %hash_for_log(passphrase), "vault unlocked");
                Ok(())
            }
            Err(e) => {
                guard.passphrase = None;
                Err(e)
            }
        }
    }

    /// Decrypt and return the full typed state.
    pub async fn retrieve(&self) -> Result<T> {
        let guard = self.inner.lock().await;
        self.read_state(&guard)
    }

    /// Read-modify-encrypt-write as one atomic unit relative to the lock.
    ///
    /// The closure's return value is handed back to the caller; the state
    /// is re-encrypted and persisted only when the closure succeeds.
    pub async fn update<R>(&self, mutate: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let guard = self.inner.lock().await;
        let mut state = self.read_state(&guard)?;
        let output = mutate(&mut state)?;
        let passphrase = guard.passphrase.as_ref().ok_or(Error::Locked)?;
        self.write_state(passphrase, &state)?;
        Ok(output)
    }

    fn read_state(&self, guard: &MutexGuard<'_, VaultInner>) -> Result<T> {
        let blob = self.storage.read_ciphertext()?;
        if blob.is_empty() {
            return Err(Error::NotInitialized);
        }
        let passphrase = guard.passphrase.as_ref().ok_or(Error::Locked)?;
        let plaintext = Zeroizing::new(cipher::open(passphrase, &blob)?);
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn write_state(&self, passphrase: &str, state: &T) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(state)?);
        let blob = cipher::seal(passphrase, &plaintext)?;
        self.storage.write_ciphertext(&blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde::Deserialize;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    fn vault() -> EncryptedVault<Counter, MemoryStorage> {
        EncryptedVault::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        assert!(matches!(
            vault.initialize("pw").await,
            Err(Error::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn initialize_leaves_vault_locked() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        assert!(!vault.is_unlocked().await);
        assert!(matches!(vault.retrieve().await, Err(Error::Locked)));
    }

    #[tokio::test]
    async fn unlock_wrong_passphrase_relocks_without_mutation() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        let before = vault.storage.read_ciphertext().unwrap();

        assert!(matches!(
            vault.unlock("wrong").await,
            Err(Error::InvalidPassphrase)
        ));
        assert!(!vault.is_unlocked().await);
        assert_eq!(vault.storage.read_ciphertext().unwrap(), before);

        vault.unlock("pw").await.unwrap();
        assert!(vault.is_unlocked().await);
    }

    #[tokio::test]
    async fn unlock_before_initialize_fails() {
        let vault = vault();
        assert!(matches!(
            vault.unlock("pw").await,
            Err(Error::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn update_round_trips_state() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        vault.unlock("pw").await.unwrap();

        vault
            .update(|state| {
                state.value += 41;
                Ok(())
            })
            .await
            .unwrap();
        vault
            .update(|state| {
                state.value += 1;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(vault.retrieve().await.unwrap().value, 42);
    }

    #[tokio::test]
    async fn failed_update_persists_nothing() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        vault.unlock("pw").await.unwrap();

        let result: Result<()> = vault
            .update(|state| {
                state.value = 99;
                Err(Error::Storage("synthetic".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(vault.retrieve().await.unwrap().value, 0);
    }

    #[tokio::test]
    async fn lock_after_unlock_requires_no_reinitialize() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        vault.unlock("pw").await.unwrap();
        vault.lock().await;
        assert!(!vault.is_unlocked().await);
        vault.unlock("pw").await.unwrap();
        assert_eq!(vault.retrieve().await.unwrap().value, 0);
    }

    #[tokio::test]
    async fn reinitialize_overwrites_existing_state() {
        let vault = vault();
        vault.initialize("pw").await.unwrap();
        vault.unlock("pw").await.unwrap();
        vault
            .update(|state| {
                state.value = 7;
                Ok(())
            })
            .await
            .unwrap();

        vault.reinitialize("fresh").await.unwrap();
        assert!(!vault.is_unlocked().await);
        vault.unlock("fresh").await.unwrap();
        assert_eq!(vault.retrieve().await.unwrap().value, 0);
    }
}

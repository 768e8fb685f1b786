//! Per-network deposit CRUD over the encrypted vault.

use std::future::Future;

use tracing::{debug, info, warn};

use sable_common::{Network, PoolPair};

use crate::deposits::{Deposit, DepositStatus, DepositVaultState, NetworkDeposits};
use crate::storage::VaultStorage;
use crate::vault::EncryptedVault;
use crate::{Error, Result};

/// Final payload a reconstruction producer hands back to the vault.
#[derive(Clone, Debug, Default)]
pub struct ImportOutcome {
    /// Replacement deposit list for the network.
    pub deposits: Vec<Deposit>,
    /// Human-readable per-pair failures collected during reconstruction.
    pub errors: Vec<String>,
}

/// Owns the per-network deposit lists and enforces single-writer semantics.
///
/// Every operation resolves the chain id to a [`Network`], acquires the
/// vault lock exactly once, and performs its whole read-modify-write inside
/// that acquisition.
pub struct DepositVault<S> {
    vault: EncryptedVault<DepositVaultState, S>,
}

impl<S: VaultStorage> DepositVault<S> {
    pub fn new(storage: S) -> Self {
        Self {
            vault: EncryptedVault::new(storage),
        }
    }

    /// Access to the underlying encrypted vault (initialize/unlock/lock).
    pub fn vault(&self) -> &EncryptedVault<DepositVaultState, S> {
        &self.vault
    }

    pub async fn unlock(&self, passphrase: &str) -> Result<()> {
        self.vault.unlock(passphrase).await
    }

    pub async fn lock(&self) {
        self.vault.lock().await
    }

    fn resolve(chain_id: u64) -> Result<Network> {
        Network::from_chain_id(chain_id).map_err(|_| Error::UnsupportedNetwork(chain_id))
    }

    /// Snapshot of one network's sub-state.
    ///
    /// A network that has never been persisted (e.g. newly added to the
    /// supported set) is auto-provisioned with empty default sub-state, and
    /// that upgrade is persisted before the snapshot is returned.
    pub async fn vault_for(&self, chain_id: u64) -> Result<NetworkDeposits> {
        let network = Self::resolve(chain_id)?;
        self.vault
            .update(|state| {
                if !state.networks.contains_key(&network) {
                    info!(%network, "provisioning deposit sub-state for new network");
                    state.networks.insert(network, NetworkDeposits::default());
                }
                Ok(state
                    .networks
                    .get(&network)
                    .cloned()
                    .unwrap_or_default())
            })
            .await
    }

    /// Next derivation index for a pair: 0 when no deposits exist,
    /// otherwise `max(deposit_index) + 1`.
    pub async fn derived_deposit_index(&self, pair: &PoolPair, chain_id: u64) -> Result<u32> {
        let network = Self::resolve(chain_id)?;
        let state = self.vault.retrieve().await?;
        let next = state
            .networks
            .get(&network)
            .map(|sub| {
                sub.deposits
                    .iter()
                    .filter(|deposit| deposit.pair == *pair)
                    .map(|deposit| deposit.deposit_index + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        Ok(next)
    }

    /// Mark deposits spent, matching stored records **by note value**.
    ///
    /// No-op when `deposits` is empty; fails with `DepositNotFound` when any
    /// input note is absent. One lock acquisition for the whole batch.
    pub async fn set_spent(&self, deposits: &[Deposit], chain_id: u64) -> Result<()> {
        if deposits.is_empty() {
            return Ok(());
        }
        let network = Self::resolve(chain_id)?;
        let notes: Vec<String> = deposits.iter().map(|d| d.note_hex.clone()).collect();
        self.vault
            .update(|state| {
                let sub = state
                    .networks
                    .get_mut(&network)
                    .ok_or_else(|| Error::DepositNotFound(notes[0].clone()))?;
                for note in &notes {
                    let stored = sub
                        .deposits
                        .iter_mut()
                        .find(|deposit| deposit.note_hex == *note)
                        .ok_or_else(|| Error::DepositNotFound(note.clone()))?;
                    stored.spent = Some(true);
                    stored.timestamp = Deposit::now();
                }
                Ok(())
            })
            .await?;
        debug!(count = deposits.len(), %network, "deposits marked spent");
        Ok(())
    }

    /// Append deposits to the network's list.
    ///
    /// This layer performs no deduplication; callers guarantee they do not
    /// double-add a note.
    pub async fn add_deposits(&self, deposits: Vec<Deposit>, chain_id: u64) -> Result<()> {
        if deposits.is_empty() {
            return Ok(());
        }
        let network = Self::resolve(chain_id)?;
        let count = deposits.len();
        self.vault
            .update(|state| {
                let sub = state.networks.entry(network).or_default();
                debug_assert!(
                    deposits.iter().all(|incoming| sub
                        .deposits
                        .iter()
                        .all(|existing| existing.note_hex != incoming.note_hex)),
                    "duplicate note appended to deposit vault"
                );
                sub.deposits.extend(deposits.iter().cloned());
                Ok(())
            })
            .await?;
        debug!(count, %network, "deposits appended");
        Ok(())
    }

    /// Remove a FAILED deposit record, freeing its derivation slot.
    pub async fn drop_failed_deposit(&self, deposit_id: &str, chain_id: u64) -> Result<()> {
        let network = Self::resolve(chain_id)?;
        let id = deposit_id.to_string();
        self.vault
            .update(|state| {
                let sub = state
                    .networks
                    .get_mut(&network)
                    .ok_or_else(|| Error::DepositNotFound(id.clone()))?;
                let position = sub
                    .deposits
                    .iter()
                    .position(|deposit| deposit.id == id)
                    .ok_or_else(|| Error::DepositNotFound(id.clone()))?;
                if sub.deposits[position].status != DepositStatus::Failed {
                    return Err(Error::DepositNotFailed(id.clone()));
                }
                sub.deposits.remove(position);
                Ok(())
            })
            .await?;
        info!(deposit_id, %network, "failed deposit dropped");
        Ok(())
    }

    /// Set a deposit's status and refresh its timestamp.
    pub async fn update_deposit_status(
        &self,
        deposit_id: &str,
        status: DepositStatus,
        chain_id: u64,
    ) -> Result<()> {
        let network = Self::resolve(chain_id)?;
        let id = deposit_id.to_string();
        self.vault
            .update(|state| {
                let sub = state
                    .networks
                    .get_mut(&network)
                    .ok_or_else(|| Error::DepositNotFound(id.clone()))?;
                let stored = sub
                    .deposits
                    .iter_mut()
                    .find(|deposit| deposit.id == id)
                    .ok_or_else(|| Error::DepositNotFound(id.clone()))?;
                stored.status = status;
                stored.timestamp = Deposit::now();
                Ok(())
            })
            .await?;
        debug!(deposit_id, ?status, "deposit status updated");
        Ok(())
    }

    /// Run a seed-based reconstruction and persist its result.
    ///
    /// The vault lock is released while `producer` runs so a slow network
    /// scan never blocks other vault users; the final write **replaces** the
    /// network's deposit list. A deposit added concurrently during the
    /// producer window is therefore lost (last write wins) — accepted
    /// trade-off, callers that need strict accounting must serialize at a
    /// higher layer.
    pub async fn import_deposits<F, Fut>(&self, chain_id: u64, producer: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<ImportOutcome, String>>,
    {
        let network = Self::resolve(chain_id)?;

        // First acquisition: flag the import as in progress.
        self.vault
            .update(|state| {
                let sub = state.networks.entry(network).or_default();
                sub.is_loading = true;
                sub.is_initialized = false;
                state.is_imported = true;
                Ok(())
            })
            .await?;

        // Lock deliberately not held across the producer.
        let produced = producer().await;

        match produced {
            Ok(outcome) => {
                // Second acquisition: replacing write of the final state.
                self.vault
                    .update(|state| {
                        state.networks.insert(
                            network,
                            NetworkDeposits {
                                deposits: outcome.deposits.clone(),
                                is_loading: false,
                                is_initialized: true,
                                errors_initializing: outcome.errors.clone(),
                            },
                        );
                        Ok(())
                    })
                    .await?;
                info!(
                    %network,
                    deposits = outcome.deposits.len(),
                    errors = outcome.errors.len(),
                    "deposit import complete"
                );
                Ok(())
            }
            Err(message) => {
                warn!(%network, error = %message, "deposit import producer failed");
                Err(Error::ImportFailed(message))
            }
        }
    }
}

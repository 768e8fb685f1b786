//! Reconciliation of derived notes against on-chain events.
//!
//! The "next free deposit" question is answered by re-deriving candidates
//! index by index and checking their commitments against the indexed
//! deposit events. Used slots become recovered deposit records; unused
//! slots are probed a window ahead so an on-chain gap never strands the
//! indices behind it.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sable_common::{pool_instance, pool_instances, InstanceKey, Network, PoolPair};
use sable_events::{EventFetcher, EventKind, EventStore};
use sable_vault::{
    Deposit, DepositStatus, DepositVault, ImportOutcome, VaultStorage,
};

use crate::deriver::{NoteCandidate, NoteDeriver};
use crate::{Error, Result};

/// Result of a next-free-deposit run for one pair.
#[derive(Clone, Debug)]
pub struct NextFreeDeposit {
    /// The first candidate with no on-chain deposit (and a clear window
    /// ahead of it).
    pub next_deposit: NoteCandidate,
    /// The candidate re-occupies the slot of a dropped FAILED record.
    pub replaces_failed_slot: bool,
    /// Derived notes that turned out to exist on chain, as vault-ready
    /// records. `None` when the walk recovered nothing.
    pub recovered_deposits: Option<Vec<Deposit>>,
    /// Non-fatal degradations hit along the way (fetch failures, unknown
    /// spent state).
    pub errors: Vec<String>,
}

/// Per-pair settled result of a reconstruction run.
#[derive(Clone, Debug)]
pub struct PairOutcome {
    pub pair: PoolPair,
    pub outcome: std::result::Result<NextFreeDeposit, String>,
}

/// Freshness of the withdrawal view during one reconciliation run.
enum WithdrawalView {
    Stale,
    Fresh,
    Unavailable,
}

/// Drives derivation, event fetching, and the vault together.
pub struct NoteReconciler<S: VaultStorage> {
    deriver: NoteDeriver,
    vault: Arc<DepositVault<S>>,
    fetcher: EventFetcher,
    store: Mutex<EventStore>,
}

impl<S: VaultStorage> NoteReconciler<S> {
    pub fn new(deriver: NoteDeriver, vault: Arc<DepositVault<S>>, fetcher: EventFetcher) -> Self {
        Self {
            deriver,
            vault,
            fetcher,
            store: Mutex::new(EventStore::new()),
        }
    }

    pub fn deriver(&self) -> &NoteDeriver {
        &self.deriver
    }

    pub fn vault(&self) -> &DepositVault<S> {
        &self.vault
    }

    /// Shared event store, for proof assembly over the same view the
    /// reconciler built.
    pub fn store(&self) -> &Mutex<EventStore> {
        &self.store
    }

    /// Find the next unused derivation slot for `pair`.
    ///
    /// With `is_reconstruct` the walk starts at index 0 and both event
    /// streams are refreshed up front, fetch failures aborting the run.
    /// Otherwise the walk starts at the vault's next derivation index,
    /// FAILED records are reused first, and fetch failures degrade: they
    /// are recorded in `errors` and unindexed commitments read as unused.
    pub async fn next_free_deposit(
        &self,
        pair: &PoolPair,
        is_reconstruct: bool,
        chain_id: u64,
    ) -> Result<NextFreeDeposit> {
        let network = Network::from_chain_id(chain_id)?;
        // A pair can hold a derivation slot without being deployed here.
        pool_instance(network, pair)?;
        let key = InstanceKey::new(network, pair.clone());
        let window = network.derivations_forward();
        let mut errors = Vec::new();

        let mut withdrawal_view = WithdrawalView::Stale;
        {
            let mut store = self.store.lock().await;
            if let Err(e) = self.fetcher.refresh(&mut store, EventKind::Deposits, &key).await {
                if is_reconstruct {
                    return Err(e.into());
                }
                warn!(instance = %key, error = %e, "deposit fetch degraded");
                errors.push(e.to_string());
            }
            if is_reconstruct {
                self.fetcher
                    .refresh(&mut store, EventKind::Withdrawals, &key)
                    .await?;
                withdrawal_view = WithdrawalView::Fresh;
            }
        }

        // A dropped-and-redeposited FAILED slot comes first: its index was
        // already burned, and re-deriving it reproduces the original note.
        if !is_reconstruct {
            let sub = self.vault.vault_for(chain_id).await?;
            let failed = sub
                .deposits
                .iter()
                .find(|deposit| deposit.pair == *pair && deposit.status == DepositStatus::Failed)
                .cloned();
            if let Some(failed) = failed {
                let candidate = self
                    .deriver
                    .derive_note(failed.deposit_index, chain_id, pair)
                    .await?;
                self.vault.drop_failed_deposit(&failed.id, chain_id).await?;
                info!(instance = %key, index = failed.deposit_index, "reusing failed deposit slot");
                return Ok(NextFreeDeposit {
                    next_deposit: candidate,
                    replaces_failed_slot: true,
                    recovered_deposits: None,
                    errors,
                });
            }
        }

        let start = if is_reconstruct {
            0
        } else {
            self.vault.derived_deposit_index(pair, chain_id).await?
        };

        let mut recovered = Vec::new();
        let mut index = start;
        loop {
            let candidate = self.deriver.derive_note(index, chain_id, pair).await?;
            if self.is_indexed(&key, &candidate).await {
                let deposit = self
                    .recover(&key, candidate, &mut withdrawal_view, &mut errors)
                    .await?;
                recovered.push(deposit);
                index += 1;
                continue;
            }

            // Probe the rest of the window: a used slot further ahead means
            // this seed has history past the gap.
            let mut used_ahead = Vec::new();
            for ahead in 1..window {
                let probe = self.deriver.derive_note(index + ahead, chain_id, pair).await?;
                if self.is_indexed(&key, &probe).await {
                    used_ahead.push(probe);
                }
            }
            if used_ahead.is_empty() {
                debug!(
                    instance = %key,
                    index,
                    recovered = recovered.len(),
                    "next free deposit located"
                );
                return Ok(NextFreeDeposit {
                    next_deposit: candidate,
                    replaces_failed_slot: false,
                    recovered_deposits: (!recovered.is_empty()).then_some(recovered),
                    errors,
                });
            }
            let resume = used_ahead
                .iter()
                .map(|probe| probe.deposit_index)
                .max()
                .unwrap_or(index)
                + 1;
            for probe in used_ahead {
                let deposit = self
                    .recover(&key, probe, &mut withdrawal_view, &mut errors)
                    .await?;
                recovered.push(deposit);
            }
            index = resume;
        }
    }

    async fn is_indexed(&self, key: &InstanceKey, candidate: &NoteCandidate) -> bool {
        let store = self.store.lock().await;
        store
            .deposit_by_commitment(key, &candidate.commitment_hex)
            .is_some()
    }

    /// Turn an on-chain candidate into a vault record, resolving its spent
    /// state as far as the withdrawal view allows.
    async fn recover(
        &self,
        key: &InstanceKey,
        candidate: NoteCandidate,
        withdrawal_view: &mut WithdrawalView,
        errors: &mut Vec<String>,
    ) -> Result<Deposit> {
        let spent = self
            .spent_state(key, &candidate.nullifier_hash_hex, withdrawal_view, errors)
            .await;
        let timestamp = {
            let store = self.store.lock().await;
            store
                .deposit_by_commitment(key, &candidate.commitment_hex)
                .map(|event| event.timestamp)
                .unwrap_or_else(Deposit::now)
        };
        Ok(Deposit {
            id: Deposit::generate_id(),
            pair: candidate.pair,
            deposit_index: candidate.deposit_index,
            note_hex: candidate.note_hex,
            nullifier_hex: candidate.nullifier_hash_hex,
            spent,
            deposit_address: None,
            timestamp,
            status: DepositStatus::Confirmed,
            chain_id: candidate.chain_id,
        })
    }

    /// `Some(true)` when a withdrawal is indexed, `Some(false)` after a
    /// fresh miss, `None` when the withdrawal stream could not be fetched.
    async fn spent_state(
        &self,
        key: &InstanceKey,
        nullifier_hex: &str,
        view: &mut WithdrawalView,
        errors: &mut Vec<String>,
    ) -> Option<bool> {
        let mut store = self.store.lock().await;
        if store.is_spent(key, nullifier_hex) {
            return Some(true);
        }
        match view {
            WithdrawalView::Fresh => Some(false),
            WithdrawalView::Unavailable => None,
            WithdrawalView::Stale => {
                match self
                    .fetcher
                    .refresh(&mut store, EventKind::Withdrawals, key)
                    .await
                {
                    Ok(()) => {
                        *view = WithdrawalView::Fresh;
                        Some(store.is_spent(key, nullifier_hex))
                    }
                    Err(e) => {
                        warn!(instance = %key, error = %e, "spent-state lookup degraded");
                        errors.push(e.to_string());
                        *view = WithdrawalView::Unavailable;
                        None
                    }
                }
            }
        }
    }

    /// Run reconciliation for every pair deployed on the network.
    ///
    /// Pairs run concurrently and settle independently: one pair failing
    /// never aborts its siblings. When `mnemonic` is given the derivation
    /// root is (re)loaded from it first.
    pub async fn reconstruct(
        &self,
        mnemonic: Option<&str>,
        chain_id: u64,
    ) -> Result<Vec<PairOutcome>> {
        if let Some(phrase) = mnemonic {
            self.deriver.set_root_from_mnemonic(phrase).await?;
        } else if !self.deriver.has_root().await {
            return Err(Error::RootPathNotSet);
        }
        let network = Network::from_chain_id(chain_id)?;

        let tasks = pool_instances(network).into_iter().map(|instance| {
            let pair = instance.pair;
            async move {
                let outcome = self
                    .next_free_deposit(&pair, true, chain_id)
                    .await
                    .map_err(|e| e.to_string());
                PairOutcome { pair, outcome }
            }
        });
        let outcomes = join_all(tasks).await;
        info!(
            chain_id,
            pairs = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.outcome.is_err()).count(),
            "reconstruction settled"
        );
        Ok(outcomes)
    }

    /// Seed-only import: reconstruct every pair and persist the merged
    /// result through the vault's import path.
    ///
    /// Per-pair failures become entries in the persisted error list rather
    /// than aborting the import; only a failure to run the reconstruction
    /// at all surfaces as an error.
    pub async fn import_notes(
        &self,
        passphrase: Option<&str>,
        mnemonic: Option<&str>,
        chain_id: u64,
    ) -> Result<()> {
        if let Some(passphrase) = passphrase {
            self.vault.unlock(passphrase).await?;
        }

        self.vault
            .import_deposits(chain_id, || async {
                let outcomes = self
                    .reconstruct(mnemonic, chain_id)
                    .await
                    .map_err(|e| e.to_string())?;

                let mut deposits = Vec::new();
                let mut errors = Vec::new();
                for PairOutcome { pair, outcome } in outcomes {
                    match outcome {
                        Ok(next) => {
                            if let Some(recovered) = next.recovered_deposits {
                                deposits.extend(recovered.into_iter().map(|mut deposit| {
                                    deposit.chain_id = chain_id;
                                    deposit
                                }));
                            }
                            errors.extend(next.errors);
                        }
                        Err(message) => errors.push(format!("{pair}: {message}")),
                    }
                }
                Ok(ImportOutcome { deposits, errors })
            })
            .await?;
        Ok(())
    }
}

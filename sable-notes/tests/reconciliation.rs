//! End-to-end reconciliation scenarios over an in-process indexer fake.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sable_common::{Currency, PoolPair};
use sable_crypto::{spawn_worker, Blake2Provider};
use sable_events::{
    DepositEvent, EventFetcher, EventKind, EventPage, IndexerApi, WithdrawalEvent,
};
use sable_notes::{NoteDeriver, NoteReconciler};
use sable_vault::{Deposit, DepositStatus, DepositVault, MemoryStorage};

const MNEMONIC: &str = "test test test test test test test test test test test junk";
const CHAIN_ID: u64 = 5;

/// Serves canned events per pair; optionally fails every request.
#[derive(Default)]
struct FakeIndexer {
    deposits: Mutex<HashMap<String, Vec<DepositEvent>>>,
    withdrawals: Mutex<HashMap<String, Vec<WithdrawalEvent>>>,
    fail: AtomicBool,
}

impl FakeIndexer {
    fn add_deposit(&self, pair: &PoolPair, leaf_index: u64, commitment: &str) {
        self.deposits
            .lock()
            .unwrap()
            .entry(pair.to_string())
            .or_default()
            .push(DepositEvent {
                leaf_index,
                commitment: commitment.to_string(),
                timestamp: 1_700_000_000 + leaf_index,
                transaction_hash: format!("0xt{leaf_index:x}"),
                block_number: 10 * (leaf_index + 1),
            });
    }

    fn add_withdrawal(&self, pair: &PoolPair, nullifier_hex: &str) {
        self.withdrawals
            .lock()
            .unwrap()
            .entry(pair.to_string())
            .or_default()
            .push(WithdrawalEvent {
                nullifier_hex: nullifier_hex.to_string(),
                to: "0xrecipient".into(),
                fee: "0".into(),
                transaction_hash: "0xw".into(),
                block_number: 1000,
            });
    }
}

#[async_trait]
impl IndexerApi for FakeIndexer {
    async fn fetch(
        &self,
        kind: EventKind,
        _chain_id: u64,
        pair: &PoolPair,
        from_block: u64,
    ) -> sable_events::Result<EventPage> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(sable_events::Error::MalformedResponse(
                "synthetic outage".into(),
            ));
        }
        let key = pair.to_string();
        Ok(match kind {
            EventKind::Deposits => EventPage::Deposits(
                self.deposits
                    .lock()
                    .unwrap()
                    .get(&key)
                    .map(|events| {
                        events
                            .iter()
                            .filter(|e| e.block_number >= from_block)
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            EventKind::Withdrawals => EventPage::Withdrawals(
                self.withdrawals
                    .lock()
                    .unwrap()
                    .get(&key)
                    .map(|events| {
                        events
                            .iter()
                            .filter(|e| e.block_number >= from_block)
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        })
    }
}

async fn engine(indexer: Arc<FakeIndexer>) -> NoteReconciler<MemoryStorage> {
    let vault = Arc::new(DepositVault::new(MemoryStorage::new()));
    vault.vault().initialize("pw").await.unwrap();
    vault.unlock("pw").await.unwrap();

    let deriver = NoteDeriver::new(spawn_worker(Blake2Provider));
    deriver.set_root_from_mnemonic(MNEMONIC).await.unwrap();

    let fetcher = EventFetcher::new(indexer, None);
    NoteReconciler::new(deriver, vault, fetcher)
}

fn pair() -> PoolPair {
    PoolPair::new(Currency::Eth, "1")
}

#[tokio::test(start_paused = true)]
async fn gap_in_history_is_jumped_and_recovered() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer.clone()).await;
    let pair = pair();

    // Indices 0 and 2 were deposited on chain; 1 never was.
    for (leaf, index) in [(0u64, 0u32), (1, 2)] {
        let candidate = engine
            .deriver()
            .derive_note(index, CHAIN_ID, &pair)
            .await
            .unwrap();
        indexer.add_deposit(&pair, leaf, &candidate.commitment_hex);
    }

    let next = engine
        .next_free_deposit(&pair, true, CHAIN_ID)
        .await
        .unwrap();
    assert_eq!(next.next_deposit.deposit_index, 3);
    assert!(!next.replaces_failed_slot);
    assert!(next.errors.is_empty());

    let recovered = next.recovered_deposits.unwrap();
    let indices: Vec<u32> = recovered.iter().map(|d| d.deposit_index).collect();
    assert_eq!(indices, vec![0, 2]);
    for deposit in &recovered {
        assert_eq!(deposit.status, DepositStatus::Confirmed);
        assert_eq!(deposit.spent, Some(false));
    }
}

#[tokio::test(start_paused = true)]
async fn recovered_deposit_reflects_withdrawal() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer.clone()).await;
    let pair = pair();

    let spent_note = engine
        .deriver()
        .derive_note(0, CHAIN_ID, &pair)
        .await
        .unwrap();
    indexer.add_deposit(&pair, 0, &spent_note.commitment_hex);
    indexer.add_withdrawal(&pair, &spent_note.nullifier_hash_hex);

    let next = engine
        .next_free_deposit(&pair, true, CHAIN_ID)
        .await
        .unwrap();
    let recovered = next.recovered_deposits.unwrap();
    assert_eq!(recovered.len(), 1);
    assert_eq!(recovered[0].spent, Some(true));
}

#[tokio::test(start_paused = true)]
async fn walk_resumes_after_highest_vault_index() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer).await;
    let pair = pair();

    let mut records = Vec::new();
    for index in [0u32, 2, 5] {
        let candidate = engine
            .deriver()
            .derive_note(index, CHAIN_ID, &pair)
            .await
            .unwrap();
        records.push(Deposit {
            id: Deposit::generate_id(),
            pair: pair.clone(),
            deposit_index: index,
            note_hex: candidate.note_hex,
            nullifier_hex: candidate.nullifier_hash_hex,
            spent: None,
            deposit_address: None,
            timestamp: 1,
            status: DepositStatus::Confirmed,
            chain_id: CHAIN_ID,
        });
    }
    engine.vault().add_deposits(records, CHAIN_ID).await.unwrap();

    let next = engine
        .next_free_deposit(&pair, false, CHAIN_ID)
        .await
        .unwrap();
    assert_eq!(next.next_deposit.deposit_index, 6);
    assert!(next.recovered_deposits.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_slot_is_reused_with_identical_note() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer).await;
    let pair = pair();

    let original = engine
        .deriver()
        .derive_note(1, CHAIN_ID, &pair)
        .await
        .unwrap();
    let failed = Deposit {
        id: Deposit::generate_id(),
        pair: pair.clone(),
        deposit_index: 1,
        note_hex: original.note_hex.clone(),
        nullifier_hex: original.nullifier_hash_hex.clone(),
        spent: None,
        deposit_address: None,
        timestamp: 1,
        status: DepositStatus::Failed,
        chain_id: CHAIN_ID,
    };
    let failed_id = failed.id.clone();
    engine
        .vault()
        .add_deposits(vec![failed], CHAIN_ID)
        .await
        .unwrap();

    let next = engine
        .next_free_deposit(&pair, false, CHAIN_ID)
        .await
        .unwrap();
    assert!(next.replaces_failed_slot);
    assert_eq!(next.next_deposit.deposit_index, 1);
    // Same slot, same seed: the note bytes must reproduce exactly.
    assert_eq!(next.next_deposit.note_hex, original.note_hex);

    // The failed record was dropped in the same pass.
    let sub = engine.vault().vault_for(CHAIN_ID).await.unwrap();
    assert!(sub.deposits.iter().all(|d| d.id != failed_id));
}

#[tokio::test(start_paused = true)]
async fn undeployed_pair_is_rejected() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer).await;

    // Bnb-0.1 has a derivation slot but no Goerli deployment.
    let undeployed = PoolPair::new(Currency::Bnb, "0.1");
    let result = engine
        .next_free_deposit(&undeployed, false, CHAIN_ID)
        .await;
    assert!(matches!(
        result,
        Err(sable_notes::Error::Common(
            sable_common::Error::UnsupportedPair(_)
        ))
    ));
}

#[tokio::test(start_paused = true)]
async fn degraded_fetch_records_error_without_failing() {
    let indexer = Arc::new(FakeIndexer::default());
    indexer.fail.store(true, Ordering::SeqCst);
    let engine = engine(indexer).await;
    let pair = pair();

    let next = engine
        .next_free_deposit(&pair, false, CHAIN_ID)
        .await
        .unwrap();
    assert_eq!(next.next_deposit.deposit_index, 0);
    assert!(!next.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconstruct_settles_pairs_independently() {
    let indexer = Arc::new(FakeIndexer::default());
    indexer.fail.store(true, Ordering::SeqCst);
    let engine = engine(indexer).await;

    // Fetch failures abort each pair during reconstruction, but the run
    // itself settles every pair.
    let outcomes = engine.reconstruct(Some(MNEMONIC), CHAIN_ID).await.unwrap();
    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(|outcome| outcome.outcome.is_err()));
}

#[tokio::test(start_paused = true)]
async fn import_notes_persists_recovered_history() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer.clone()).await;
    let pair = pair();

    for (leaf, index) in [(0u64, 0u32), (1, 1)] {
        let candidate = engine
            .deriver()
            .derive_note(index, CHAIN_ID, &pair)
            .await
            .unwrap();
        indexer.add_deposit(&pair, leaf, &candidate.commitment_hex);
    }

    engine
        .import_notes(None, Some(MNEMONIC), CHAIN_ID)
        .await
        .unwrap();

    let sub = engine.vault().vault_for(CHAIN_ID).await.unwrap();
    assert!(sub.is_initialized);
    assert!(!sub.is_loading);
    assert_eq!(sub.deposits.len(), 2);
    assert!(sub.deposits.iter().all(|d| d.chain_id == CHAIN_ID));
    assert!(sub
        .deposits
        .iter()
        .all(|d| d.status == DepositStatus::Confirmed));

    let state = engine.vault().vault().retrieve().await.unwrap();
    assert!(state.is_imported);
}

#[tokio::test(start_paused = true)]
async fn rederivation_after_import_matches_recovered_notes() {
    let indexer = Arc::new(FakeIndexer::default());
    let engine = engine(indexer.clone()).await;
    let pair = pair();

    let candidate = engine
        .deriver()
        .derive_note(0, CHAIN_ID, &pair)
        .await
        .unwrap();
    indexer.add_deposit(&pair, 0, &candidate.commitment_hex);

    engine
        .import_notes(None, Some(MNEMONIC), CHAIN_ID)
        .await
        .unwrap();

    let sub = engine.vault().vault_for(CHAIN_ID).await.unwrap();
    assert_eq!(sub.deposits[0].note_hex, candidate.note_hex);
    assert_eq!(sub.deposits[0].nullifier_hex, candidate.nullifier_hash_hex);
}

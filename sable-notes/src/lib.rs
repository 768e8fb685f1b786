//! Note derivation and deposit reconciliation.
//!
//! Notes are derived deterministically from a bip39 seed, so the full
//! deposit history of a wallet is recoverable from its mnemonic alone: the
//! reconciler re-derives candidate notes index by index and checks each
//! commitment against the on-chain event record.

mod deriver;
mod error;
mod reconcile;
mod withdraw;

pub use deriver::{NoteCandidate, NoteDeriver};
pub use error::{Error, Result};
pub use reconcile::{NextFreeDeposit, NoteReconciler, PairOutcome};
pub use withdraw::{prepare_withdrawal, WithdrawRequest};

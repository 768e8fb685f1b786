//! Hashing and proof-generation capability for the deposit engine.
//!
//! The engine never computes commitment hashes or zk proofs inline: callers
//! hold a [`WorkerHandle`] and suspend on a request/response round-trip to a
//! background worker task that owns a [`CryptoProvider`]. Tests substitute
//! the in-process [`Blake2Provider`]; production binds the real
//! Pedersen/zk-SNARK provider behind the same trait.

mod error;
mod provider;
mod worker;

pub use error::{Error, Result};
pub use provider::{Blake2Provider, CryptoProvider, ProofData, ProofWitness};
pub use worker::{spawn_worker, WorkerHandle};

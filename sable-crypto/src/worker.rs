//! Background worker task and its request/response channel.
//!
//! Requests carry a correlation id so overlapping round-trips from multiple
//! callers stay attributable in traces; replies travel on per-request
//! oneshot channels.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::provider::{CryptoProvider, ProofData, ProofWitness};
use crate::{Error, Result};

const REQUEST_QUEUE_DEPTH: usize = 64;

enum WorkerOp {
    KeyedHash64(Vec<u8>),
    PedersenHash(Vec<u8>),
    Prove(Box<ProofWitness>),
}

enum WorkerReply {
    Bytes64(Box<[u8; 64]>),
    Bytes32([u8; 32]),
    Proof(ProofData),
}

struct WorkerRequest {
    id: u64,
    op: WorkerOp,
    reply: oneshot::Sender<Result<WorkerReply>>,
}

/// Cloneable handle to a spawned crypto worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerRequest>,
    next_id: Arc<AtomicU64>,
}

/// Spawn a worker task owning `provider` and return a handle to it.
///
/// The task exits when the last handle is dropped.
pub fn spawn_worker<P: CryptoProvider>(provider: P) -> WorkerHandle {
    let (tx, mut rx) = mpsc::channel::<WorkerRequest>(REQUEST_QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let WorkerRequest { id, op, reply } = request;
            let outcome = match op {
                WorkerOp::KeyedHash64(input) => {
                    Ok(WorkerReply::Bytes64(Box::new(provider.keyed_hash64(&input))))
                }
                WorkerOp::PedersenHash(input) => {
                    Ok(WorkerReply::Bytes32(provider.pedersen_hash(&input)))
                }
                WorkerOp::Prove(witness) => provider.prove(&witness).map(WorkerReply::Proof),
            };
            if reply.send(outcome).is_err() {
                warn!(request_id = id, "crypto caller dropped before reply");
            }
        }
        debug!("crypto worker shutting down");
    });

    WorkerHandle {
        tx,
        next_id: Arc::new(AtomicU64::new(0)),
    }
}

impl WorkerHandle {
    async fn round_trip(&self, op: WorkerOp) -> Result<WorkerReply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(WorkerRequest {
                id,
                op,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::WorkerGone)?;
        debug!(request_id = id, "crypto request dispatched");
        reply_rx.await.map_err(|_| Error::WorkerGone)?
    }

    /// Keyed 64-byte hash of `input`.
    pub async fn keyed_hash64(&self, input: Vec<u8>) -> Result<[u8; 64]> {
        match self.round_trip(WorkerOp::KeyedHash64(input)).await? {
            WorkerReply::Bytes64(bytes) => Ok(*bytes),
            _ => Err(Error::WorkerGone),
        }
    }

    /// Pedersen-style commitment hash of `input`.
    pub async fn pedersen_hash(&self, input: Vec<u8>) -> Result<[u8; 32]> {
        match self.round_trip(WorkerOp::PedersenHash(input)).await? {
            WorkerReply::Bytes32(bytes) => Ok(bytes),
            _ => Err(Error::WorkerGone),
        }
    }

    /// Produce a withdrawal proof for `witness`.
    pub async fn prove(&self, witness: ProofWitness) -> Result<ProofData> {
        match self.round_trip(WorkerOp::Prove(Box::new(witness))).await? {
            WorkerReply::Proof(proof) => Ok(proof),
            _ => Err(Error::WorkerGone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Blake2Provider;

    #[tokio::test]
    async fn worker_round_trip_matches_inline_provider() {
        let handle = spawn_worker(Blake2Provider);
        let via_worker = handle.pedersen_hash(b"note".to_vec()).await.unwrap();
        assert_eq!(via_worker, Blake2Provider.pedersen_hash(b"note"));
    }

    #[tokio::test]
    async fn concurrent_requests_stay_correlated() {
        let handle = spawn_worker(Blake2Provider);
        let inputs: Vec<Vec<u8>> = (0u8..32).map(|i| vec![i; 8]).collect();
        let futures: Vec<_> = inputs
            .iter()
            .map(|input| handle.pedersen_hash(input.clone()))
            .collect();
        let results = futures::future::join_all(futures).await;
        for (input, result) in inputs.iter().zip(results) {
            assert_eq!(result.unwrap(), Blake2Provider.pedersen_hash(input));
        }
    }
}

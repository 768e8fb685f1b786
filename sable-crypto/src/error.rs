//! Error types for the crypto worker.

use thiserror::Error;

/// Result type alias for crypto operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during hashing or proof generation.
#[derive(Debug, Error)]
pub enum Error {
    /// The worker task terminated before answering a request.
    #[error("crypto worker is gone")]
    WorkerGone,

    /// Proof generation failed inside the provider.
    #[error("prover error: {0}")]
    Prover(String),

    /// The provider rejected its input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

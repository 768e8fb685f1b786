use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Derivation requested before a seed was loaded.
    #[error("derivation root not set")]
    RootPathNotSet,

    /// The mnemonic phrase failed bip39 validation.
    #[error("invalid mnemonic: {0}")]
    Mnemonic(String),

    /// A withdrawal was requested for a note with no on-chain deposit.
    #[error("note has no deposit on chain: commitment {0}")]
    NoteNotDeposited(String),

    /// A note preimage was not valid 62-byte hex.
    #[error("malformed note: {0}")]
    MalformedNote(String),

    #[error(transparent)]
    Common(#[from] sable_common::Error),

    #[error(transparent)]
    Crypto(#[from] sable_crypto::Error),

    #[error(transparent)]
    Vault(#[from] sable_vault::Error),

    #[error(transparent)]
    Events(#[from] sable_events::Error),

    #[error(transparent)]
    Tree(#[from] sable_tree::Error),
}

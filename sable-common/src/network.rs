//! Supported networks and their per-network scan parameters.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Forward-scan window used when a network does not override it.
pub const DEFAULT_DERIVATIONS_FORWARD: u32 = 10;

/// Closed set of networks the deposit engine operates on.
///
/// New networks are added here and in [`crate::pool_instances`]; the vault
/// controller auto-provisions empty sub-state the first time a variant is
/// seen in a persisted blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Goerli,
    Bsc,
    Polygon,
    Avalanche,
    ArbitrumOne,
    Optimism,
}

/// Confirmation and forward-scan parameters for one network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIntervals {
    /// Blocks before a submitted deposit is considered confirmed.
    pub deposit_confirmations: u64,
    /// Forward-scan window for gap detection; `None` falls back to
    /// [`DEFAULT_DERIVATIONS_FORWARD`].
    pub derivations_forward: Option<u32>,
}

impl Network {
    /// Resolve a chain id to a supported network.
    pub fn from_chain_id(chain_id: u64) -> Result<Self> {
        match chain_id {
            1 => Ok(Network::Mainnet),
            5 => Ok(Network::Goerli),
            56 => Ok(Network::Bsc),
            137 => Ok(Network::Polygon),
            43114 => Ok(Network::Avalanche),
            42161 => Ok(Network::ArbitrumOne),
            10 => Ok(Network::Optimism),
            other => Err(Error::UnsupportedNetwork(other)),
        }
    }

    /// Canonical chain id for this network.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Goerli => 5,
            Network::Bsc => 56,
            Network::Polygon => 137,
            Network::Avalanche => 43114,
            Network::ArbitrumOne => 42161,
            Network::Optimism => 10,
        }
    }

    /// Human-readable network name, used as the persisted map key.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Goerli => "goerli",
            Network::Bsc => "bsc",
            Network::Polygon => "polygon",
            Network::Avalanche => "avalanche",
            Network::ArbitrumOne => "arbitrum_one",
            Network::Optimism => "optimism",
        }
    }

    /// Scan parameters for this network.
    pub fn intervals(&self) -> NetworkIntervals {
        match self {
            Network::Mainnet => NetworkIntervals {
                deposit_confirmations: 12,
                derivations_forward: Some(30),
            },
            Network::Goerli => NetworkIntervals {
                deposit_confirmations: 4,
                derivations_forward: None,
            },
            Network::Bsc | Network::Polygon | Network::Avalanche => NetworkIntervals {
                deposit_confirmations: 16,
                derivations_forward: None,
            },
            Network::ArbitrumOne | Network::Optimism => NetworkIntervals {
                deposit_confirmations: 4,
                derivations_forward: None,
            },
        }
    }

    /// Effective forward-scan window for this network.
    pub fn derivations_forward(&self) -> u32 {
        self.intervals()
            .derivations_forward
            .unwrap_or(DEFAULT_DERIVATIONS_FORWARD)
    }

    /// All supported networks, in chain-id order of definition.
    pub fn all() -> &'static [Network] {
        &[
            Network::Mainnet,
            Network::Goerli,
            Network::Bsc,
            Network::Polygon,
            Network::Avalanche,
            Network::ArbitrumOne,
            Network::Optimism,
        ]
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

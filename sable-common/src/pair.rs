//! Pool pair (currency + fixed denomination) identification.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Currencies with at least one deployed pool instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Eth,
    Dai,
    Usdc,
    Wbtc,
    Matic,
    Bnb,
    Avax,
}

impl Currency {
    /// Lowercase ticker, used in derivation paths and indexer queries.
    pub fn ticker(&self) -> &'static str {
        match self {
            Currency::Eth => "eth",
            Currency::Dai => "dai",
            Currency::Usdc => "usdc",
            Currency::Wbtc => "wbtc",
            Currency::Matic => "matic",
            Currency::Bnb => "bnb",
            Currency::Avax => "avax",
        }
    }

    fn from_ticker(ticker: &str) -> Option<Self> {
        match ticker {
            "eth" => Some(Currency::Eth),
            "dai" => Some(Currency::Dai),
            "usdc" => Some(Currency::Usdc),
            "wbtc" => Some(Currency::Wbtc),
            "matic" => Some(Currency::Matic),
            "bnb" => Some(Currency::Bnb),
            "avax" => Some(Currency::Avax),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.ticker())
    }
}

/// A `(currency, amount)` pool pair.
///
/// Amounts are canonical decimal strings ("0.1", "1", "100"); each deployed
/// pool contract serves exactly one pair, so the pair identifies both the
/// denomination and the derivation slot.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolPair {
    pub currency: Currency,
    pub amount: String,
}

impl PoolPair {
    pub fn new(currency: Currency, amount: impl Into<String>) -> Self {
        Self {
            currency,
            amount: amount.into(),
        }
    }

    /// Parse a `"eth-1"` style key.
    pub fn parse(key: &str) -> Result<Self> {
        let (ticker, amount) = key
            .split_once('-')
            .ok_or_else(|| Error::UnsupportedPair(key.to_string()))?;
        let currency = Currency::from_ticker(ticker)
            .ok_or_else(|| Error::UnsupportedPair(key.to_string()))?;
        if amount.is_empty() {
            return Err(Error::UnsupportedPair(key.to_string()));
        }
        Ok(Self::new(currency, amount))
    }
}

impl std::fmt::Display for PoolPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.currency, self.amount)
    }
}

impl std::str::FromStr for PoolPair {
    type Err = Error;

    fn from_str(key: &str) -> Result<Self> {
        Self::parse(key)
    }
}

//! Static pool-instance and derivation-path tables.
//!
//! Both tables are closed: a pair that is not listed is a hard
//! `UnsupportedPair` error. Derivation slots in particular must never be
//! inferred from position or insertion order, since changing an index would
//! silently corrupt every historical derivation for that pair.

use serde::{Deserialize, Serialize};

use crate::{Currency, Error, Network, PoolPair, Result};

/// Version tag of the derivation-path table. Bump only with a migration
/// that re-derives existing notes.
pub const DERIVATION_TABLE_VERSION: u32 = 1;

/// Key identifying one pool instance: a pair deployed on a network.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub network: Network,
    pub pair: PoolPair,
}

impl InstanceKey {
    pub fn new(network: Network, pair: PoolPair) -> Self {
        Self { network, pair }
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.pair)
    }
}

/// One deployed pool contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolInstance {
    pub network: Network,
    pub pair: PoolPair,
    /// Pool contract address, 0x-prefixed.
    pub contract: &'static str,
    /// Derivation slot from the versioned table.
    pub pair_index: u8,
}

/// `(currency, amount) -> derivation slot`, table version 1.
///
/// Slots are allocated once per pair across all networks; the chain id
/// enters the derivation path separately.
const DERIVATION_TABLE_V1: &[(Currency, &str, u8)] = &[
    (Currency::Eth, "0.1", 0),
    (Currency::Eth, "1", 1),
    (Currency::Eth, "10", 2),
    (Currency::Eth, "100", 3),
    (Currency::Dai, "100", 4),
    (Currency::Dai, "1000", 5),
    (Currency::Dai, "10000", 6),
    (Currency::Dai, "100000", 7),
    (Currency::Usdc, "100", 8),
    (Currency::Usdc, "1000", 9),
    (Currency::Wbtc, "0.1", 10),
    (Currency::Wbtc, "1", 11),
    (Currency::Wbtc, "10", 12),
    (Currency::Matic, "100", 13),
    (Currency::Matic, "1000", 14),
    (Currency::Matic, "10000", 15),
    (Currency::Matic, "100000", 16),
    (Currency::Bnb, "0.1", 17),
    (Currency::Bnb, "1", 18),
    (Currency::Bnb, "10", 19),
    (Currency::Bnb, "100", 20),
    (Currency::Avax, "10", 21),
    (Currency::Avax, "100", 22),
    (Currency::Avax, "500", 23),
];

/// Per-network deployed instances: `(currency, amount, contract)`.
const MAINNET_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Eth, "0.1", "0x12D66f87A04A9E220743712cE6d9bB1B5616B8Fc"),
    (Currency::Eth, "1", "0x47CE0C6eD5B0Ce3d3A51fdb1C52DC66a7c3c2936"),
    (Currency::Eth, "10", "0x910Cbd523D972eb0a6f4cAe4618aD62622b39DbF"),
    (Currency::Eth, "100", "0xA160cdAB225685dA1d56aa342Ad8841c3b53f291"),
    (Currency::Dai, "100", "0xD4B88Df4D29F5CedD6857912842cff3b20C8Cfa3"),
    (Currency::Dai, "1000", "0xFD8610d20aA15b7B2E3Be39B396a1bC3516c7144"),
    (Currency::Dai, "10000", "0x07687e702b410Fa43f4cB4Af7FA097918ffD2730"),
    (Currency::Dai, "100000", "0x23773E65ed146A459791799d01336DB287f25334"),
    (Currency::Wbtc, "0.1", "0x178169B423a011fff22B9e3F3abeA13414dDD0F1"),
    (Currency::Wbtc, "1", "0x610B717796ad172B316836AC95a2ffad065CeaB4"),
    (Currency::Wbtc, "10", "0xbB93e510BbCD0B7beb5A853875f9eC60275CF498"),
];

const GOERLI_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Eth, "0.1", "0x6Bf694a291DF3FeC1f7e69701E3ab6c592435Ae7"),
    (Currency::Eth, "1", "0x3aac1cC67c2ec5Db4eA850957b967Ba153aD6279"),
    (Currency::Eth, "10", "0x723B78e67497E85279CB204544566F4dC5d2acA0"),
    (Currency::Eth, "100", "0x0E3A09dDA6B20aFbB34aC7cD4A6881493f3E7bf7"),
    (Currency::Dai, "100", "0x76D85B4C0Fc497EeCc38902397aC608000A06607"),
    (Currency::Dai, "1000", "0xCC84179FFD19A1627E79F8648d09e095252Bc418"),
];

const BSC_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Bnb, "0.1", "0x84443CFd09A48AF6eF360C6976C5392aC5023a1F"),
    (Currency::Bnb, "1", "0xd47438C816c9E7f2E2888E060936a499Af9582b3"),
    (Currency::Bnb, "10", "0x330bdFADE01eE9bF63C209Ee33102DD334618e0a"),
    (Currency::Bnb, "100", "0x1E34A77868E19A6647b1f2F47B51ed72dEDE95DD"),
];

const POLYGON_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Matic, "100", "0x1E34A77868E19A6647b1f2F47B51ed72dEDE95DD"),
    (Currency::Matic, "1000", "0xdf231d99Ff8b6c6CBF4E9B9a945CBAcEF9339178"),
    (Currency::Matic, "10000", "0xaf4c0B70B2Ea9FB7487C7CbB37aDa259579fe040"),
    (Currency::Matic, "100000", "0xa5C2254e4253490C54cef0a4347fddb8f75A4998"),
];

const AVALANCHE_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Avax, "10", "0x330bdFADE01eE9bF63C209Ee33102DD334618e0a"),
    (Currency::Avax, "100", "0x955cd88D905d983d41Ca9b51a3685800F2B0B71c"),
    (Currency::Avax, "500", "0xA60C772958a3eD56c1F15dD055bA37AC8e523a0D"),
];

const ARBITRUM_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Eth, "0.1", "0x84443CFd09A48AF6eF360C6976C5392aC5023a1F"),
    (Currency::Eth, "1", "0xd47438C816c9E7f2E2888E060936a499Af9582b3"),
    (Currency::Eth, "10", "0x330bdFADE01eE9bF63C209Ee33102DD334618e0a"),
    (Currency::Eth, "100", "0x1E34A77868E19A6647b1f2F47B51ed72dEDE95DD"),
];

const OPTIMISM_INSTANCES: &[(Currency, &str, &str)] = &[
    (Currency::Eth, "0.1", "0x84443CFd09A48AF6eF360C6976C5392aC5023a1F"),
    (Currency::Eth, "1", "0xd47438C816c9E7f2E2888E060936a499Af9582b3"),
    (Currency::Eth, "10", "0x330bdFADE01eE9bF63C209Ee33102DD334618e0a"),
    (Currency::Eth, "100", "0x1E34A77868E19A6647b1f2F47B51ed72dEDE95DD"),
];

fn raw_instances(network: Network) -> &'static [(Currency, &'static str, &'static str)] {
    match network {
        Network::Mainnet => MAINNET_INSTANCES,
        Network::Goerli => GOERLI_INSTANCES,
        Network::Bsc => BSC_INSTANCES,
        Network::Polygon => POLYGON_INSTANCES,
        Network::Avalanche => AVALANCHE_INSTANCES,
        Network::ArbitrumOne => ARBITRUM_INSTANCES,
        Network::Optimism => OPTIMISM_INSTANCES,
    }
}

/// Derivation slot for a pair, from the versioned table.
pub fn derivation_pair_index(pair: &PoolPair) -> Result<u8> {
    DERIVATION_TABLE_V1
        .iter()
        .find(|(currency, amount, _)| *currency == pair.currency && *amount == pair.amount)
        .map(|(_, _, index)| *index)
        .ok_or_else(|| Error::UnsupportedPair(pair.to_string()))
}

/// All pool instances deployed on a network.
pub fn pool_instances(network: Network) -> Vec<PoolInstance> {
    raw_instances(network)
        .iter()
        .map(|(currency, amount, contract)| {
            let pair = PoolPair::new(*currency, *amount);
            let pair_index = derivation_pair_index(&pair)
                .unwrap_or_else(|_| unreachable!("instance table references unlisted pair"));
            PoolInstance {
                network,
                pair,
                contract,
                pair_index,
            }
        })
        .collect()
}

/// Resolve one pool instance, failing with `UnsupportedPair` when the pair
/// has no deployment on the network.
pub fn pool_instance(network: Network, pair: &PoolPair) -> Result<PoolInstance> {
    pool_instances(network)
        .into_iter()
        .find(|instance| instance.pair == *pair)
        .ok_or_else(|| Error::UnsupportedPair(format!("{}/{}", network, pair)))
}

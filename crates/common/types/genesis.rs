use bytes::Bytes;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::{BufReader, Error},
    path::Path,
};
use tracing::warn;

/// Initial configuration of a chain.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArbosGenesis {
    #[serde(with = "crate::serde_utils::u64::hex_or_dec_str")]
    pub chain_id: u64,
    pub owner: Address,
    #[serde(default)]
    pub default_aggregator: Address,
    #[serde(default)]
    pub gas_price_oracle: Option<Address>,
    /// Chain parameter overrides, keyed by parameter name.
    #[serde(default)]
    pub parameters: BTreeMap<String, U256>,
    /// The initial state of the accounts.
    #[serde(default)]
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenesisAccount {
    #[serde(default, with = "crate::serde_utils::u256::hex_or_dec_str")]
    pub balance: U256,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub code: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    #[error("Failed to decode genesis file: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to open genesis file: {0}")]
    File(#[from] Error),
}

impl TryFrom<&Path> for ArbosGenesis {
    type Error = GenesisError;

    fn try_from(genesis_file_path: &Path) -> Result<Self, Self::Error> {
        let genesis_file = std::fs::File::open(genesis_file_path)?;
        let genesis_reader = BufReader::new(genesis_file);
        let genesis: ArbosGenesis = serde_json::from_reader(genesis_reader)?;

        if genesis.owner.is_zero() {
            warn!("Genesis has no chain owner, owner-only operations are limited to the system address")
        }

        Ok(genesis)
    }
}

use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use super::{CodePoint, JumpTable};

/// Persistent storage cells of a contract.
pub type Storage = BTreeMap<U256, U256>;

/// Per-address state.
///
/// An account that was never written is indistinguishable from
/// [`Account::pristine`], which is what the store hands out on a miss.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub nonce: u64,
    pub balance: U256,
    pub contract: Option<ContractInfo>,
    pub aggregator: Option<AggregatorInfo>,
    pub preferred_aggregator: Option<Address>,
    pub auth_key: Option<H256>,
}

impl Account {
    pub fn pristine(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn has_code(&self) -> bool {
        self.contract.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.contract.is_none()
    }

    pub fn code_hash(&self) -> Option<H256> {
        self.contract.as_ref().map(|contract| contract.code_hash)
    }
}

/// Deployed contract: its EVM code, how that code was translated and its storage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub code: Bytes,
    pub code_hash: H256,
    pub jump_table: JumpTable,
    pub entry_point: CodePoint,
    pub storage: Storage,
}

/// Extra state carried by accounts acting as batch aggregators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorInfo {
    pub decompression: Option<DecompressionState>,
    pub fee_collector: Address,
    pub base_l1_fee: U256,
}

impl AggregatorInfo {
    pub fn new(fee_collector: Address, base_l1_fee: U256) -> Self {
        Self {
            decompression: None,
            fee_collector,
            base_l1_fee,
        }
    }
}

/// Address table used to expand compressed transactions submitted through an aggregator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompressionState {
    addresses: Vec<Address>,
}

impl DecompressionState {
    /// Returns the index of `address`, appending it if it's not in the table yet.
    pub fn register(&mut self, address: Address) -> u64 {
        let index = match self.addresses.iter().position(|known| *known == address) {
            Some(index) => index,
            None => {
                self.addresses.push(address);
                self.addresses.len() - 1
            }
        };
        index as u64
    }

    pub fn lookup(&self, index: u64) -> Option<Address> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.addresses.get(index))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

use std::collections::BTreeMap;

use arbos_common::{
    Address, Bytes, H256, U256,
    constants::{
        DEFAULT_ARBGAS_DIVISOR, DEFAULT_BASE_STAKE_WEI, DEFAULT_GAS_POOL_MAX,
        DEFAULT_GRACE_PERIOD_TICKS, DEFAULT_L1_GAS_PER_L1_CALLDATA_BYTE,
        DEFAULT_L1_GAS_PER_L2_TX, DEFAULT_L1_GAS_PER_STORAGE, DEFAULT_MAX_EXECUTION_STEPS,
        DEFAULT_SPEED_LIMIT_PER_SECOND, DEFAULT_SPEED_LIMIT_PER_TICK, DEFAULT_TX_GAS_LIMIT,
    },
    types::ArbosGenesis,
    utils::{address_to_word, keccak, u256_to_h256, word_to_address},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("Unknown chain parameter `{0}`")]
    UnknownParameter(String),
}

/// Protocol parameters known by name. Each is stored under `keccak(name)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainParameter {
    ChainOwner,
    ChainId,
    DefaultAggregator,
    GasPriceOracle,
    NetworkFeeRecipient,
    GracePeriodTicks,
    SpeedLimitPerTick,
    MaxExecutionSteps,
    BaseStakeWei,
    StakingToken,
    TxGasLimit,
    GasPoolMax,
    SpeedLimitPerSecond,
    L1GasPerL2Tx,
    L1GasPerL1CalldataByte,
    L1GasPerStorage,
    ArbGasDivisor,
}

impl ChainParameter {
    pub const ALL: [ChainParameter; 17] = [
        ChainParameter::ChainOwner,
        ChainParameter::ChainId,
        ChainParameter::DefaultAggregator,
        ChainParameter::GasPriceOracle,
        ChainParameter::NetworkFeeRecipient,
        ChainParameter::GracePeriodTicks,
        ChainParameter::SpeedLimitPerTick,
        ChainParameter::MaxExecutionSteps,
        ChainParameter::BaseStakeWei,
        ChainParameter::StakingToken,
        ChainParameter::TxGasLimit,
        ChainParameter::GasPoolMax,
        ChainParameter::SpeedLimitPerSecond,
        ChainParameter::L1GasPerL2Tx,
        ChainParameter::L1GasPerL1CalldataByte,
        ChainParameter::L1GasPerStorage,
        ChainParameter::ArbGasDivisor,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ChainParameter::ChainOwner => "ChainOwner",
            ChainParameter::ChainId => "ChainID",
            ChainParameter::DefaultAggregator => "DefaultAggregator",
            ChainParameter::GasPriceOracle => "GasPriceOracle",
            ChainParameter::NetworkFeeRecipient => "NetworkFeeRecipient",
            ChainParameter::GracePeriodTicks => "GracePeriodTicks",
            ChainParameter::SpeedLimitPerTick => "SpeedLimitPerTick",
            ChainParameter::MaxExecutionSteps => "MaxExecutionSteps",
            ChainParameter::BaseStakeWei => "BaseStakeWei",
            ChainParameter::StakingToken => "StakingToken",
            ChainParameter::TxGasLimit => "TxGasLimit",
            ChainParameter::GasPoolMax => "GasPoolMax",
            ChainParameter::SpeedLimitPerSecond => "SpeedLimitPerSecond",
            ChainParameter::L1GasPerL2Tx => "L1GasPerL2Tx",
            ChainParameter::L1GasPerL1CalldataByte => "L1GasPerL1CalldataByte",
            ChainParameter::L1GasPerStorage => "L1GasPerStorage",
            ChainParameter::ArbGasDivisor => "ArbGasDivisor",
        }
    }

    pub fn id(self) -> H256 {
        keccak(self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.name() == name)
    }
}

/// Keyed mapping of protocol parameters. Unset ids read as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainParameters {
    values: BTreeMap<H256, U256>,
}

impl ChainParameters {
    /// Parameters a fresh chain starts with.
    pub fn with_defaults(chain_id: u64, owner: Address) -> Self {
        let mut params = Self::default();
        for (param, value) in [
            (ChainParameter::ChainId, U256::from(chain_id)),
            (ChainParameter::ChainOwner, address_to_word(owner)),
            (ChainParameter::GracePeriodTicks, U256::from(DEFAULT_GRACE_PERIOD_TICKS)),
            (ChainParameter::SpeedLimitPerTick, U256::from(DEFAULT_SPEED_LIMIT_PER_TICK)),
            (ChainParameter::MaxExecutionSteps, U256::from(DEFAULT_MAX_EXECUTION_STEPS)),
            (ChainParameter::BaseStakeWei, U256::from(DEFAULT_BASE_STAKE_WEI)),
            (ChainParameter::TxGasLimit, U256::from(DEFAULT_TX_GAS_LIMIT)),
            (ChainParameter::GasPoolMax, U256::from(DEFAULT_GAS_POOL_MAX)),
            (ChainParameter::SpeedLimitPerSecond, U256::from(DEFAULT_SPEED_LIMIT_PER_SECOND)),
            (ChainParameter::L1GasPerL2Tx, U256::from(DEFAULT_L1_GAS_PER_L2_TX)),
            (
                ChainParameter::L1GasPerL1CalldataByte,
                U256::from(DEFAULT_L1_GAS_PER_L1_CALLDATA_BYTE),
            ),
            (ChainParameter::L1GasPerStorage, U256::from(DEFAULT_L1_GAS_PER_STORAGE)),
            (ChainParameter::ArbGasDivisor, U256::from(DEFAULT_ARBGAS_DIVISOR)),
        ] {
            params.set_param(param, value);
        }
        params
    }

    pub fn from_genesis(genesis: &ArbosGenesis) -> Result<Self, ParameterError> {
        let mut params = Self::with_defaults(genesis.chain_id, genesis.owner);
        params.set_address(ChainParameter::DefaultAggregator, genesis.default_aggregator);
        if let Some(oracle) = genesis.gas_price_oracle {
            params.set_address(ChainParameter::GasPriceOracle, oracle);
        }
        for (name, value) in &genesis.parameters {
            let param = ChainParameter::from_name(name)
                .ok_or_else(|| ParameterError::UnknownParameter(name.clone()))?;
            params.set_param(param, *value);
        }
        Ok(params)
    }

    pub fn get(&self, id: H256) -> U256 {
        self.values.get(&id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, id: H256, value: U256) {
        self.values.insert(id, value);
    }

    pub fn get_param(&self, param: ChainParameter) -> U256 {
        self.get(param.id())
    }

    pub fn set_param(&mut self, param: ChainParameter, value: U256) {
        self.set(param.id(), value);
    }

    pub fn get_u64(&self, param: ChainParameter) -> u64 {
        self.get_param(param).low_u64()
    }

    pub fn get_address(&self, param: ChainParameter) -> Address {
        word_to_address(self.get_param(param))
    }

    pub fn set_address(&mut self, param: ChainParameter, address: Address) {
        self.set_param(param, address_to_word(address));
    }

    pub fn owner(&self) -> Address {
        self.get_address(ChainParameter::ChainOwner)
    }

    pub fn chain_id(&self) -> u64 {
        self.get_u64(ChainParameter::ChainId)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Count word followed by `(id, value)` word pairs in id order.
    pub fn serialize(&self) -> Bytes {
        let mut out = Vec::with_capacity(32 * (1 + 2 * self.values.len()));
        out.extend_from_slice(u256_to_h256(U256::from(self.values.len())).as_bytes());
        for (id, value) in &self.values {
            out.extend_from_slice(id.as_bytes());
            out.extend_from_slice(&value.to_big_endian());
        }
        Bytes::from(out)
    }
}

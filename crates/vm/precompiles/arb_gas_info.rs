//! `ArbGasInfo`: read access to the fee schedule.

use std::sync::LazyLock;

use arbos_common::{Address, Bytes, U256, constants::SYSTEM_ADDRESS};
use arbos_storage::ChainParameter;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use super::{PrecompileEnv, non_payable};
use crate::{
    calldata::{CalldataReader, Value, compute_function_selector, encode_tuple},
    errors::VMError,
    fees::FeeSchedule,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArbGasInfoMethod {
    GetPricesInWei,
    GetPricesInWeiWithAggregator,
    GetPricesInArbGas,
    GetPricesInArbGasWithAggregator,
    GetGasAccountingParams,
    GetL1GasPriceEstimate,
    SetL1GasPriceEstimate,
}

impl ArbGasInfoMethod {
    pub const ALL: [ArbGasInfoMethod; 7] = [
        ArbGasInfoMethod::GetPricesInWei,
        ArbGasInfoMethod::GetPricesInWeiWithAggregator,
        ArbGasInfoMethod::GetPricesInArbGas,
        ArbGasInfoMethod::GetPricesInArbGasWithAggregator,
        ArbGasInfoMethod::GetGasAccountingParams,
        ArbGasInfoMethod::GetL1GasPriceEstimate,
        ArbGasInfoMethod::SetL1GasPriceEstimate,
    ];

    pub const fn signature(self) -> &'static str {
        match self {
            ArbGasInfoMethod::GetPricesInWei => "getPricesInWei()",
            ArbGasInfoMethod::GetPricesInWeiWithAggregator => {
                "getPricesInWeiWithAggregator(address)"
            }
            ArbGasInfoMethod::GetPricesInArbGas => "getPricesInArbGas()",
            ArbGasInfoMethod::GetPricesInArbGasWithAggregator => {
                "getPricesInArbGasWithAggregator(address)"
            }
            ArbGasInfoMethod::GetGasAccountingParams => "getGasAccountingParams()",
            ArbGasInfoMethod::GetL1GasPriceEstimate => "getL1GasPriceEstimate()",
            ArbGasInfoMethod::SetL1GasPriceEstimate => "setL1GasPriceEstimate(uint256)",
        }
    }

    pub fn selector(self) -> [u8; 4] {
        compute_function_selector(self.signature())
    }

    pub fn from_selector(selector: [u8; 4]) -> Option<Self> {
        SELECTORS.get(&selector).copied()
    }
}

static SELECTORS: LazyLock<FxHashMap<[u8; 4], ArbGasInfoMethod>> = LazyLock::new(|| {
    ArbGasInfoMethod::ALL
        .iter()
        .map(|method| (method.selector(), *method))
        .collect()
});

fn uints(values: impl IntoIterator<Item = U256>) -> Bytes {
    let values: Vec<Value> = values.into_iter().map(Value::Uint).collect();
    Bytes::from(encode_tuple(&values))
}

/// Base L1 fee of `aggregator`, if it is registered as one.
fn aggregator_fee(env: &PrecompileEnv<'_>, aggregator: Address) -> Option<U256> {
    env.frame
        .accounts()
        .account(&aggregator)
        .and_then(|account| account.aggregator.as_ref())
        .map(|info| info.base_l1_fee)
}

pub fn call(env: &mut PrecompileEnv<'_>, calldata: &[u8]) -> Result<Bytes, VMError> {
    non_payable(env)?;
    let (selector, args) = CalldataReader::split(calldata)?;
    let method = ArbGasInfoMethod::from_selector(selector)
        .ok_or_else(|| VMError::revert("unknown ArbGasInfo selector"))?;

    let schedule = FeeSchedule::new(env.params, env.owner_state.l1_gas_price_estimate());
    match method {
        ArbGasInfoMethod::GetPricesInWei => Ok(uints(schedule.prices_in_wei(None)?.to_words())),
        ArbGasInfoMethod::GetPricesInWeiWithAggregator => {
            let fee = aggregator_fee(env, args.address(0)?);
            Ok(uints(schedule.prices_in_wei(fee)?.to_words()))
        }
        ArbGasInfoMethod::GetPricesInArbGas => Ok(uints(schedule.prices_in_arbgas(None)?)),
        ArbGasInfoMethod::GetPricesInArbGasWithAggregator => {
            let fee = aggregator_fee(env, args.address(0)?);
            Ok(uints(schedule.prices_in_arbgas(fee)?))
        }
        ArbGasInfoMethod::GetGasAccountingParams => Ok(uints(schedule.gas_accounting_params())),
        ArbGasInfoMethod::GetL1GasPriceEstimate => {
            Ok(uints([env.owner_state.l1_gas_price_estimate()]))
        }
        ArbGasInfoMethod::SetL1GasPriceEstimate => {
            let oracle = env.params.get_address(ChainParameter::GasPriceOracle);
            let caller = env.caller;
            if caller != SYSTEM_ADDRESS && caller != env.params.owner() && caller != oracle {
                warn!(%caller, "Unauthorized L1 gas price update");
                return Err(VMError::revert("caller may not set the L1 gas price"));
            }
            let price = args.word(0)?;
            env.owner_state.set_l1_gas_price_estimate(price);
            info!(%price, %caller, "L1 gas price estimate set");
            Ok(Bytes::new())
        }
    }
}

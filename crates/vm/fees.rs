use arbos_common::U256;
use arbos_storage::{ChainParameter, ChainParameters};

use crate::errors::{InternalError, VMError};

/// Read-only view of the fee constants, priced at one L1 gas price.
///
/// L1 costs are quoted in L1 gas by the chain parameters; the ArbGas base
/// price is the L1 gas price scaled down by `ArbGasDivisor`. Congestion
/// pricing is left to the external fee curve and reads as zero here.
#[derive(Clone, Copy, Debug)]
pub struct FeeSchedule<'a> {
    params: &'a ChainParameters,
    l1_gas_price: U256,
}

/// Values returned by `getPricesInWei`, in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PricesInWei {
    pub per_l2_tx: U256,
    pub per_l1_calldata_byte: U256,
    pub per_storage_cell: U256,
    pub per_arbgas_base: U256,
    pub per_arbgas_congestion: U256,
    pub per_arbgas_total: U256,
}

impl PricesInWei {
    pub fn to_words(self) -> [U256; 6] {
        [
            self.per_l2_tx,
            self.per_l1_calldata_byte,
            self.per_storage_cell,
            self.per_arbgas_base,
            self.per_arbgas_congestion,
            self.per_arbgas_total,
        ]
    }
}

impl<'a> FeeSchedule<'a> {
    pub fn new(params: &'a ChainParameters, l1_gas_price: U256) -> Self {
        Self {
            params,
            l1_gas_price,
        }
    }

    fn l1_cost(&self, l1_gas: U256) -> Result<U256, VMError> {
        l1_gas
            .checked_mul(self.l1_gas_price)
            .ok_or(VMError::Internal(InternalError::Overflow("L1 fee")))
    }

    /// Wei per ArbGas before congestion. Never zero.
    pub fn arbgas_base_price(&self) -> U256 {
        let divisor = self.params.get_param(ChainParameter::ArbGasDivisor);
        if divisor.is_zero() {
            return self.l1_gas_price.max(U256::one());
        }
        (self.l1_gas_price / divisor).max(U256::one())
    }

    /// `per_tx_l1_gas` overrides the per-transaction L1 gas, as an
    /// aggregator's base L1 fee does.
    pub fn prices_in_wei(&self, per_tx_l1_gas: Option<U256>) -> Result<PricesInWei, VMError> {
        let per_tx_l1_gas =
            per_tx_l1_gas.unwrap_or_else(|| self.params.get_param(ChainParameter::L1GasPerL2Tx));
        let per_arbgas_base = self.arbgas_base_price();
        let per_arbgas_congestion = U256::zero();
        Ok(PricesInWei {
            per_l2_tx: self.l1_cost(per_tx_l1_gas)?,
            per_l1_calldata_byte: self
                .l1_cost(self.params.get_param(ChainParameter::L1GasPerL1CalldataByte))?,
            per_storage_cell: self.l1_cost(self.params.get_param(ChainParameter::L1GasPerStorage))?,
            per_arbgas_base,
            per_arbgas_congestion,
            per_arbgas_total: per_arbgas_base
                .checked_add(per_arbgas_congestion)
                .ok_or(VMError::Internal(InternalError::Overflow("ArbGas price")))?,
        })
    }

    /// The first three wei prices expressed in ArbGas at the base price.
    pub fn prices_in_arbgas(&self, per_tx_l1_gas: Option<U256>) -> Result<[U256; 3], VMError> {
        let wei = self.prices_in_wei(per_tx_l1_gas)?;
        let base = wei.per_arbgas_base;
        Ok([
            wei.per_l2_tx / base,
            wei.per_l1_calldata_byte / base,
            wei.per_storage_cell / base,
        ])
    }

    /// Speed limit per second, gas pool maximum and per-tx gas limit.
    pub fn gas_accounting_params(&self) -> [U256; 3] {
        [
            self.params.get_param(ChainParameter::SpeedLimitPerSecond),
            self.params.get_param(ChainParameter::GasPoolMax),
            self.params.get_param(ChainParameter::TxGasLimit),
        ]
    }
}

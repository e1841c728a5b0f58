//! Natively implemented system contracts.

pub mod arb_gas_info;
pub mod arb_owner;

use arbos_common::{
    Address, Bytes, U256,
    constants::{ARB_GAS_INFO_ADDRESS, ARB_OWNER_ADDRESS},
};
use arbos_storage::{ChainParameters, CodeTranslator, WorkingCopy};

use crate::{
    errors::VMError, owner_state::OwnerState, substrate::Executor, upgrade::ArbosUpgrade,
    upgrade::UpgradeController,
};

/// Everything a precompile may read or change while handling one call.
pub struct PrecompileEnv<'a> {
    /// Working copy of the frame the precompile runs in.
    pub frame: &'a mut WorkingCopy,
    pub caller: Address,
    /// Already moved from the caller to the precompile's account.
    pub value: U256,
    pub params: &'a mut ChainParameters,
    pub owner_state: &'a mut OwnerState,
    pub upgrades: &'a mut UpgradeController,
    pub translator: &'a dyn CodeTranslator,
    pub executor: &'a mut dyn Executor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrecompileOutput {
    Return(Bytes),
    /// The environment's code was replaced; the message ends here.
    Upgrade(ArbosUpgrade),
}

pub fn is_precompile(address: &Address) -> bool {
    *address == ARB_OWNER_ADDRESS || *address == ARB_GAS_INFO_ADDRESS
}

pub fn execute_precompile(
    address: Address,
    env: &mut PrecompileEnv<'_>,
    calldata: &[u8],
) -> Result<PrecompileOutput, VMError> {
    if address == ARB_OWNER_ADDRESS {
        arb_owner::call(env, calldata)
    } else if address == ARB_GAS_INFO_ADDRESS {
        arb_gas_info::call(env, calldata).map(PrecompileOutput::Return)
    } else {
        Err(VMError::revert(format!("no precompile at {address:#x}")))
    }
}

/// Rejects value sent to a method that doesn't take any.
pub(crate) fn non_payable(env: &PrecompileEnv<'_>) -> Result<(), VMError> {
    if env.value.is_zero() {
        Ok(())
    } else {
        Err(VMError::revert("method is not payable"))
    }
}

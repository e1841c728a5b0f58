//! `ArbOwner`: chain administration, reachable only by the owner and the system.

use std::sync::LazyLock;

use arbos_common::{
    Bytes, H256, U256,
    constants::{ARB_OWNER_ADDRESS, SYSTEM_ADDRESS},
    types::{CallKind, Storage},
    utils::{address_to_word, calculate_create_address, u256_to_h256},
};
use arbos_storage::{CURRENT_TX_ESCROW_KEY, ChainParameter};
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use super::{PrecompileEnv, PrecompileOutput, non_payable};
use crate::{
    calldata::{CalldataReader, Value, compute_function_selector, encode_tuple, encode_words},
    errors::{InternalError, VMError},
    substrate::ExecutionRequest,
    upgrade::UpgradeError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArbOwnerMethod {
    StartCodeUpload,
    StartCodeUploadWithCheck,
    ContinueCodeUpload,
    GetUploadedCodeHash,
    FinishCodeUploadAsArbosUpgrade,
    GetLastUpgradeHash,
    AddToReserveFunds,
    GetChainParameter,
    SetChainParameter,
    SerializeAllParameters,
    GetTotalOfEthBalances,
    DeployContract,
    AllowAllSenders,
    AllowOnlyOwnerToSend,
    IsAllowedSender,
    AddAllowedSender,
    RemoveAllowedSender,
    GetAllAllowedSenders,
    SetL1GasPriceEstimate,
    SetFairGasPriceSender,
    IsFairGasPriceSender,
    GetAllFairGasPriceSenders,
}

impl ArbOwnerMethod {
    pub const ALL: [ArbOwnerMethod; 22] = [
        ArbOwnerMethod::StartCodeUpload,
        ArbOwnerMethod::StartCodeUploadWithCheck,
        ArbOwnerMethod::ContinueCodeUpload,
        ArbOwnerMethod::GetUploadedCodeHash,
        ArbOwnerMethod::FinishCodeUploadAsArbosUpgrade,
        ArbOwnerMethod::GetLastUpgradeHash,
        ArbOwnerMethod::AddToReserveFunds,
        ArbOwnerMethod::GetChainParameter,
        ArbOwnerMethod::SetChainParameter,
        ArbOwnerMethod::SerializeAllParameters,
        ArbOwnerMethod::GetTotalOfEthBalances,
        ArbOwnerMethod::DeployContract,
        ArbOwnerMethod::AllowAllSenders,
        ArbOwnerMethod::AllowOnlyOwnerToSend,
        ArbOwnerMethod::IsAllowedSender,
        ArbOwnerMethod::AddAllowedSender,
        ArbOwnerMethod::RemoveAllowedSender,
        ArbOwnerMethod::GetAllAllowedSenders,
        ArbOwnerMethod::SetL1GasPriceEstimate,
        ArbOwnerMethod::SetFairGasPriceSender,
        ArbOwnerMethod::IsFairGasPriceSender,
        ArbOwnerMethod::GetAllFairGasPriceSenders,
    ];

    pub const fn signature(self) -> &'static str {
        match self {
            ArbOwnerMethod::StartCodeUpload => "startCodeUpload()",
            ArbOwnerMethod::StartCodeUploadWithCheck => "startCodeUploadWithCheck(bytes32)",
            ArbOwnerMethod::ContinueCodeUpload => "continueCodeUpload(bytes)",
            ArbOwnerMethod::GetUploadedCodeHash => "getUploadedCodeHash()",
            ArbOwnerMethod::FinishCodeUploadAsArbosUpgrade => {
                "finishCodeUploadAsArbosUpgrade(bytes32,bytes32)"
            }
            ArbOwnerMethod::GetLastUpgradeHash => "getLastUpgradeHash()",
            ArbOwnerMethod::AddToReserveFunds => "addToReserveFunds()",
            ArbOwnerMethod::GetChainParameter => "getChainParameter(uint256)",
            ArbOwnerMethod::SetChainParameter => "setChainParameter(uint256,uint256)",
            ArbOwnerMethod::SerializeAllParameters => "serializeAllParameters()",
            ArbOwnerMethod::GetTotalOfEthBalances => "getTotalOfEthBalances()",
            ArbOwnerMethod::DeployContract => "deployContract(bytes,address,uint256)",
            ArbOwnerMethod::AllowAllSenders => "allowAllSenders()",
            ArbOwnerMethod::AllowOnlyOwnerToSend => "allowOnlyOwnerToSend()",
            ArbOwnerMethod::IsAllowedSender => "isAllowedSender(address)",
            ArbOwnerMethod::AddAllowedSender => "addAllowedSender(address)",
            ArbOwnerMethod::RemoveAllowedSender => "removeAllowedSender(address)",
            ArbOwnerMethod::GetAllAllowedSenders => "getAllAllowedSenders()",
            ArbOwnerMethod::SetL1GasPriceEstimate => "setL1GasPriceEstimate(uint256)",
            ArbOwnerMethod::SetFairGasPriceSender => "setFairGasPriceSender(address,bool)",
            ArbOwnerMethod::IsFairGasPriceSender => "isFairGasPriceSender(address)",
            ArbOwnerMethod::GetAllFairGasPriceSenders => "getAllFairGasPriceSenders()",
        }
    }

    pub fn selector(self) -> [u8; 4] {
        compute_function_selector(self.signature())
    }

    pub fn from_selector(selector: [u8; 4]) -> Option<Self> {
        SELECTORS.get(&selector).copied()
    }
}

static SELECTORS: LazyLock<FxHashMap<[u8; 4], ArbOwnerMethod>> = LazyLock::new(|| {
    ArbOwnerMethod::ALL
        .iter()
        .map(|method| (method.selector(), *method))
        .collect()
});

fn upgrade_error(err: UpgradeError) -> VMError {
    match err {
        UpgradeError::NestedCall(depth) => InternalError::UpgradeFromNestedCall(depth).into(),
        err => VMError::revert(err.to_string()),
    }
}

fn ret(values: &[Value]) -> Result<PrecompileOutput, VMError> {
    Ok(PrecompileOutput::Return(Bytes::from(encode_tuple(values))))
}

fn empty() -> Result<PrecompileOutput, VMError> {
    Ok(PrecompileOutput::Return(Bytes::new()))
}

pub fn call(env: &mut PrecompileEnv<'_>, calldata: &[u8]) -> Result<PrecompileOutput, VMError> {
    let owner = env.params.owner();
    if env.caller != SYSTEM_ADDRESS && env.caller != owner {
        warn!(caller = %env.caller, %owner, "Unauthorized ArbOwner call");
        return Err(VMError::revert("caller is not the chain owner"));
    }

    let (selector, args) = CalldataReader::split(calldata)?;
    let method = ArbOwnerMethod::from_selector(selector)
        .ok_or_else(|| VMError::revert(format!("unknown ArbOwner selector 0x{}", hex_selector(selector))))?;
    if method != ArbOwnerMethod::AddToReserveFunds {
        non_payable(env)?;
    }

    match method {
        ArbOwnerMethod::StartCodeUpload => {
            env.upgrades.start_code_upload();
            empty()
        }
        ArbOwnerMethod::StartCodeUploadWithCheck => {
            env.upgrades
                .start_code_upload_with_check(args.h256(0)?)
                .map_err(upgrade_error)?;
            empty()
        }
        ArbOwnerMethod::ContinueCodeUpload => {
            env.upgrades
                .continue_code_upload(args.tail(0)?)
                .map_err(upgrade_error)?;
            empty()
        }
        ArbOwnerMethod::GetUploadedCodeHash => {
            let hash = env.upgrades.uploaded_code_hash().map_err(upgrade_error)?;
            ret(&[Value::FixedBytes(hash)])
        }
        ArbOwnerMethod::FinishCodeUploadAsArbosUpgrade => {
            let upgrade = env
                .upgrades
                .finish_code_upload_as_arbos_upgrade(
                    &env.frame.context(),
                    args.h256(0)?,
                    args.h256(1)?,
                    env.translator,
                )
                .map_err(upgrade_error)?;
            Ok(PrecompileOutput::Upgrade(upgrade))
        }
        ArbOwnerMethod::GetLastUpgradeHash => {
            ret(&[Value::FixedBytes(env.upgrades.last_upgrade_hash())])
        }
        ArbOwnerMethod::AddToReserveFunds => add_to_reserve_funds(env),
        ArbOwnerMethod::GetChainParameter => {
            let id = u256_to_h256(args.word(0)?);
            ret(&[Value::Uint(env.params.get(id))])
        }
        ArbOwnerMethod::SetChainParameter => {
            let id = u256_to_h256(args.word(0)?);
            let value = args.word(1)?;
            env.params.set(id, value);
            info!(%id, %value, "Chain parameter set");
            empty()
        }
        ArbOwnerMethod::SerializeAllParameters => {
            ret(&[Value::Bytes(env.params.serialize())])
        }
        ArbOwnerMethod::GetTotalOfEthBalances => {
            let accounts = env.frame.accounts();
            let total = accounts
                .total_balance()?
                .checked_add(accounts.escrow().total()?)
                .ok_or(InternalError::Overflow("total of balances"))?;
            ret(&[Value::Uint(total)])
        }
        ArbOwnerMethod::DeployContract => deploy_contract(env, &args),
        ArbOwnerMethod::AllowAllSenders => {
            env.owner_state.allow_all_senders();
            empty()
        }
        ArbOwnerMethod::AllowOnlyOwnerToSend => {
            env.owner_state.allow_only_owner_to_send();
            empty()
        }
        ArbOwnerMethod::IsAllowedSender => {
            let allowed = env.owner_state.is_allowed_sender(args.address(0)?, owner);
            ret(&[Value::Bool(allowed)])
        }
        ArbOwnerMethod::AddAllowedSender => {
            env.owner_state.add_allowed_sender(args.address(0)?);
            empty()
        }
        ArbOwnerMethod::RemoveAllowedSender => {
            env.owner_state.remove_allowed_sender(args.address(0)?);
            empty()
        }
        ArbOwnerMethod::GetAllAllowedSenders => {
            let words = encode_words(env.owner_state.allowed_senders().map(|a| address_to_word(*a)));
            ret(&[Value::Bytes(words)])
        }
        ArbOwnerMethod::SetL1GasPriceEstimate => {
            let price = args.word(0)?;
            env.owner_state.set_l1_gas_price_estimate(price);
            info!(%price, "L1 gas price estimate set");
            empty()
        }
        ArbOwnerMethod::SetFairGasPriceSender => {
            env.owner_state
                .set_fair_gas_price_sender(args.address(0)?, args.bool(1)?);
            empty()
        }
        ArbOwnerMethod::IsFairGasPriceSender => {
            let fair = env.owner_state.is_fair_gas_price_sender(args.address(0)?);
            ret(&[Value::Bool(fair)])
        }
        ArbOwnerMethod::GetAllFairGasPriceSenders => {
            let words = encode_words(
                env.owner_state
                    .fair_gas_price_senders()
                    .map(|a| address_to_word(*a)),
            );
            ret(&[Value::Bytes(words)])
        }
    }
}

fn hex_selector(selector: [u8; 4]) -> String {
    selector.iter().map(|b| format!("{b:02x}")).collect()
}

/// Moves the call value out of circulation into the chain's reserve.
fn add_to_reserve_funds(env: &mut PrecompileEnv<'_>) -> Result<PrecompileOutput, VMError> {
    if env.value.is_zero() {
        return empty();
    }
    env.frame
        .accounts_mut()
        .debit_balance(ARB_OWNER_ADDRESS, env.value)?;
    if !env.owner_state.add_to_reserve_funds(env.value) {
        return Err(InternalError::Overflow("reserve funds").into());
    }
    info!(amount = %env.value, reserve = %env.owner_state.reserve_funds(), "Added to reserve funds");
    empty()
}

/// Runs `constructorData` as if `deemedSender` had sent it with `deemedNonce`.
fn deploy_contract(
    env: &mut PrecompileEnv<'_>,
    args: &CalldataReader<'_>,
) -> Result<PrecompileOutput, VMError> {
    let constructor = Bytes::copy_from_slice(args.bytes(0)?);
    let deemed_sender = args.address(1)?;
    let deemed_nonce = u64::try_from(args.word(2)?)
        .map_err(|_| VMError::revert("deemed nonce does not fit in 64 bits"))?;
    let next_nonce = deemed_nonce
        .checked_add(1)
        .ok_or_else(|| VMError::revert("deemed nonce too large"))?;
    let address = calculate_create_address(deemed_sender, deemed_nonce);

    let mut nested = env.frame.enter_nested();
    if nested.accounts().has_contract(address) {
        warn!(%address, "deployContract target already has code");
        return Err(VMError::revert("cannot deploy at address"));
    }
    if nested.accounts().nonce(deemed_sender) < next_nonce {
        nested.accounts_mut().set_nonce(deemed_sender, next_nonce);
    }

    let request = ExecutionRequest {
        kind: CallKind::Constructor,
        caller: deemed_sender,
        callee: address,
        value: U256::zero(),
        calldata: constructor,
        max_gas: env.params.get_u64(ChainParameter::TxGasLimit),
        gas_price: U256::zero(),
        gas_payer: deemed_sender,
        escrow_key: CURRENT_TX_ESCROW_KEY,
        sequence_number: Some(deemed_nonce),
        request_id: H256::zero(),
    };
    let outcome = env.executor.execute(&mut nested, &request)?;
    if !outcome.is_success() {
        return Err(VMError::revert(format!("constructor failed: {}", outcome.result)));
    }
    nested.deploy_code(address, outcome.output, Storage::new(), env.translator)?;
    env.frame.commit_into(nested)?;

    info!(%address, %deemed_sender, deemed_nonce, "Contract deployed by owner");
    ret(&[Value::Address(address)])
}

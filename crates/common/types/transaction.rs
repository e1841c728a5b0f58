use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::constants::CREATE_ADDRESS;

/// Kind of the L1 inbox message a request came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum L1MessageKind {
    EthDeposit = 0,
    Erc20Deposit = 1,
    Erc721Deposit = 2,
    #[default]
    L2 = 3,
    ChainInit = 4,
    BuddyDeploy = 5,
    EndOfBlock = 6,
    L2FundedByL1 = 7,
    RollupProtocolEvent = 8,
}

/// Provenance of a request inside the L1 inbox.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxRequest {
    pub kind: L1MessageKind,
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub timestamp: u64,
    pub sender: Address,
    #[serde(default)]
    pub inbox_seq_num: u64,
    /// Unique id of the request, echoed back in its receipt.
    #[serde(default)]
    pub request_id: H256,
}

/// Fee-related values observed when the request was admitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSnapshot {
    #[serde(default)]
    pub l1_gas_price: U256,
    #[serde(default)]
    pub aggregator: Option<Address>,
}

/// Reference to the retryable ticket a redeem request was derived from.
/// Its escrow already holds the gas funds for the redeem.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryableRef {
    pub ticket_id: H256,
    pub escrow_key: u64,
}

/// A transaction request as handed to the dispatcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    #[serde(with = "crate::serde_utils::u64::hex_or_dec_str")]
    pub max_gas: u64,
    #[serde(default, with = "crate::serde_utils::u256::hex_or_dec_str")]
    pub gas_price: U256,
    #[serde(default, with = "crate::serde_utils::u64::hex_or_dec_str_opt")]
    pub sequence_number: Option<u64>,
    pub caller: Address,
    /// [`CREATE_ADDRESS`] means "deploy the calldata as a new contract".
    pub callee: Address,
    pub gas_payer: Address,
    #[serde(default, with = "crate::serde_utils::u256::hex_or_dec_str")]
    pub value: U256,
    #[serde(default, with = "crate::serde_utils::bytes")]
    pub calldata: Bytes,
    #[serde(default)]
    pub non_mutating: bool,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub inbox_request: InboxRequest,
    #[serde(default)]
    pub fee_snapshot: FeeSnapshot,
    #[serde(default)]
    pub retryable: Option<RetryableRef>,
}

impl TxRequest {
    pub fn is_create(&self) -> bool {
        self.callee == CREATE_ADDRESS
    }

    pub fn request_id(&self) -> H256 {
        self.inbox_request.request_id
    }
}

/// How the execution substrate must enter the callee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CallKind {
    Call = 0,
    CallCode = 1,
    DelegateCall = 2,
    StaticCall = 3,
    Constructor = 4,
}

impl CallKind {
    pub fn is_static(self) -> bool {
        matches!(self, CallKind::StaticCall)
    }
}

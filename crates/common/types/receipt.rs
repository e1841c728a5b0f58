use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Outcome code carried by every receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum TxResultCode {
    Success = 0,
    Revert = 1,
    Congestion = 2,
    NoGasFunds = 3,
    InsufficientBalance = 4,
    SequenceNumberTooLow = 5,
    SequenceNumberTooHigh = 6,
    FormatError = 7,
    CannotDeployAtAddress = 8,
    ExceededTxGasLimit = 9,
    SenderNotPermitted = 14,
    UnknownFailure = 255,
}

impl TxResultCode {
    pub fn is_success(self) -> bool {
        matches!(self, TxResultCode::Success)
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for TxResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxResultCode::Success => "success",
            TxResultCode::Revert => "revert",
            TxResultCode::Congestion => "congestion",
            TxResultCode::NoGasFunds => "no gas funds",
            TxResultCode::InsufficientBalance => "insufficient balance",
            TxResultCode::SequenceNumberTooLow => "sequence number too low",
            TxResultCode::SequenceNumberTooHigh => "sequence number too high",
            TxResultCode::FormatError => "format error",
            TxResultCode::CannotDeployAtAddress => "cannot deploy at address",
            TxResultCode::ExceededTxGasLimit => "exceeded tx gas limit",
            TxResultCode::SenderNotPermitted => "sender not permitted",
            TxResultCode::UnknownFailure => "unknown failure",
        };
        f.write_str(name)
    }
}

/// Result of processing one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub request_id: H256,
    pub caller: Address,
    pub result: TxResultCode,
    #[serde(with = "crate::serde_utils::bytes")]
    pub return_data: Bytes,
    pub gas_used: u64,
    #[serde(with = "crate::serde_utils::u256::hex_or_dec_str")]
    pub gas_price: U256,
}

impl Receipt {
    pub fn new(
        request_id: H256,
        caller: Address,
        result: TxResultCode,
        return_data: Bytes,
        gas_used: u64,
        gas_price: U256,
    ) -> Self {
        Self {
            request_id,
            caller,
            result,
            return_data,
            gas_used,
            gas_price,
        }
    }

    /// Receipt for a request rejected before execution. Nothing was charged.
    pub fn rejected(request_id: H256, caller: Address, result: TxResultCode) -> Self {
        Self::new(request_id, caller, result, Bytes::new(), 0, U256::zero())
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_success()
    }
}

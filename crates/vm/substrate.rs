//! Seams to the collaborators that run code and record results.

use arbos_common::{
    Address, Bytes, H256, U256,
    types::{CallKind, Receipt, TxResultCode},
};
use arbos_storage::{EscrowKey, WorkingCopy};
use tracing::debug;

use crate::errors::VMError;

/// Fully resolved call handed to the execution substrate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub kind: CallKind,
    pub caller: Address,
    /// Address of the new contract for [`CallKind::Constructor`].
    pub callee: Address,
    pub value: U256,
    pub calldata: Bytes,
    pub max_gas: u64,
    pub gas_price: U256,
    pub gas_payer: Address,
    /// Escrow holding the prepaid gas. [`arbos_storage::CURRENT_TX_ESCROW_KEY`] when nothing was escrowed.
    pub escrow_key: EscrowKey,
    pub sequence_number: Option<u64>,
    pub request_id: H256,
}

impl ExecutionRequest {
    pub fn is_constructor(&self) -> bool {
        self.kind == CallKind::Constructor
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub result: TxResultCode,
    pub gas_used: u64,
    /// Return data, or the runtime code for a successful constructor.
    pub output: Bytes,
}

impl ExecutionOutcome {
    pub fn success(gas_used: u64, output: Bytes) -> Self {
        Self {
            result: TxResultCode::Success,
            gas_used,
            output,
        }
    }

    pub fn failure(result: TxResultCode, gas_used: u64, output: Bytes) -> Self {
        Self {
            result,
            gas_used,
            output,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Runs contract code against a call frame's working copy.
///
/// Implementations may open nested frames with [`WorkingCopy::enter_nested`]
/// and fold them back with [`WorkingCopy::commit_into`]. They never see the
/// authoritative store.
pub trait Executor {
    fn execute(
        &mut self,
        frame: &mut WorkingCopy,
        request: &ExecutionRequest,
    ) -> Result<ExecutionOutcome, VMError>;
}

/// Destination of emitted receipts.
pub trait ReceiptJournal {
    fn emit(&mut self, receipt: Receipt);
}

impl ReceiptJournal for Vec<Receipt> {
    fn emit(&mut self, receipt: Receipt) {
        self.push(receipt);
    }
}

/// Executor for chains without an interpreter attached.
///
/// Plain transfers succeed, constructors install their init data verbatim
/// as runtime code and calls into code fail.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInterpreter;

impl Executor for NoInterpreter {
    fn execute(
        &mut self,
        frame: &mut WorkingCopy,
        request: &ExecutionRequest,
    ) -> Result<ExecutionOutcome, VMError> {
        if request.is_constructor() {
            return Ok(ExecutionOutcome::success(0, request.calldata.clone()));
        }
        if frame.accounts().has_contract(request.callee) {
            debug!(callee = %request.callee, "No interpreter available for contract call");
            return Ok(ExecutionOutcome::failure(
                TxResultCode::UnknownFailure,
                request.max_gas,
                Bytes::new(),
            ));
        }
        Ok(ExecutionOutcome::success(0, Bytes::new()))
    }
}

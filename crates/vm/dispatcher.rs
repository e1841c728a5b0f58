//! Admission of transaction requests.
//!
//! [`TransactionDispatcher::dispatch`] either rejects a request with a result
//! code, leaving the store untouched, or funds its gas, allocates its sequence
//! number and describes the call the substrate must run next.

use arbos_common::{
    U256,
    types::{CallKind, TxRequest, TxResultCode},
    utils::calculate_create_address,
};
use arbos_storage::{ChainParameter, ChainParameters, ExecutionContext, StateError, WorldState};
use tracing::{debug, error, warn};

use crate::{errors::VMError, owner_state::OwnerState, substrate::ExecutionRequest};

/// What happens to a request after admission.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Dispatch {
    /// Rejected before execution. Nothing was mutated.
    Rejected(TxResultCode),
    /// Accepted. Gas is escrowed and the nonce consumed; run this next.
    Execute(ExecutionRequest),
}

pub struct TransactionDispatcher<'a> {
    params: &'a ChainParameters,
    owner_state: &'a OwnerState,
}

impl<'a> TransactionDispatcher<'a> {
    pub fn new(params: &'a ChainParameters, owner_state: &'a OwnerState) -> Self {
        Self {
            params,
            owner_state,
        }
    }

    pub fn dispatch(
        &self,
        world: &mut WorldState,
        ctx: &ExecutionContext,
        request: &TxRequest,
    ) -> Result<Dispatch, VMError> {
        let caller = request.caller;
        let accounts = world.accounts(ctx)?;

        if !self
            .owner_state
            .is_allowed_sender(caller, self.params.owner())
        {
            warn!(%caller, "Sender not permitted");
            return Ok(Dispatch::Rejected(TxResultCode::SenderNotPermitted));
        }

        let tx_gas_limit = self.params.get_u64(ChainParameter::TxGasLimit);
        if request.max_gas > tx_gas_limit {
            warn!(%caller, max_gas = request.max_gas, tx_gas_limit, "Gas limit above the per-tx limit");
            return Ok(Dispatch::Rejected(TxResultCode::ExceededTxGasLimit));
        }

        let current_nonce = accounts.nonce(caller);
        if let Some(sequence_number) = request.sequence_number {
            if sequence_number < current_nonce {
                warn!(%caller, sequence_number, current_nonce, "Sequence number too low");
                return Ok(Dispatch::Rejected(TxResultCode::SequenceNumberTooLow));
            }
            if sequence_number > current_nonce {
                warn!(%caller, sequence_number, current_nonce, "Sequence number too high");
                return Ok(Dispatch::Rejected(TxResultCode::SequenceNumberTooHigh));
            }
        }

        if request.is_constructor && !request.is_create() {
            warn!(%caller, callee = %request.callee, "Constructor flag on a call to an existing address");
            return Ok(Dispatch::Rejected(TxResultCode::FormatError));
        }

        let (kind, callee) = if request.is_create() {
            if request.non_mutating {
                warn!(%caller, "Non-mutating constructor call");
                return Ok(Dispatch::Rejected(TxResultCode::Revert));
            }
            let address = calculate_create_address(caller, current_nonce);
            if accounts.has_contract(address) {
                error!(%caller, nonce = current_nonce, %address, "Derived contract address is already occupied");
                return Ok(Dispatch::Rejected(TxResultCode::CannotDeployAtAddress));
            }
            (CallKind::Constructor, address)
        } else if request.non_mutating {
            (CallKind::StaticCall, request.callee)
        } else {
            (CallKind::Call, request.callee)
        };

        let Some(gas_funds) = request.gas_price.checked_mul(U256::from(request.max_gas)) else {
            warn!(%caller, "Gas funds overflow");
            return Ok(Dispatch::Rejected(TxResultCode::NoGasFunds));
        };

        if let Some(retryable) = &request.retryable {
            let escrow = accounts.escrow();
            let key = retryable.escrow_key;
            let payer = escrow.payer(key);
            if !escrow.is_allocated(key)
                || payer != Some(request.gas_payer)
                || escrow.balance(key) < gas_funds
            {
                warn!(
                    %caller,
                    key,
                    ?payer,
                    gas_payer = %request.gas_payer,
                    available = %escrow.balance(key),
                    needed = %gas_funds,
                    "Retryable escrow cannot fund this redeem"
                );
                return Ok(Dispatch::Rejected(TxResultCode::NoGasFunds));
            }
        }

        // Nothing has been mutated up to here.
        let accounts = world.accounts_mut(ctx)?;
        let escrow_key = match &request.retryable {
            Some(retryable) => retryable.escrow_key,
            None => match accounts.open_escrow(request.gas_payer, gas_funds) {
                Ok(key) => key,
                Err(StateError::InsufficientBalance { balance, needed, .. }) => {
                    warn!(payer = %request.gas_payer, %balance, %needed, "Cannot fund gas");
                    return Ok(Dispatch::Rejected(TxResultCode::NoGasFunds));
                }
                Err(err) => return Err(err.into()),
            },
        };

        let sequence_number = if kind == CallKind::Constructor || request.sequence_number.is_some()
        {
            Some(accounts.fetch_and_increment_nonce(caller)?)
        } else {
            None
        };

        debug!(
            %caller,
            %callee,
            ?kind,
            ?sequence_number,
            escrow_key,
            l1_gas_price = %request.fee_snapshot.l1_gas_price,
            aggregator = ?request.fee_snapshot.aggregator,
            "Request admitted"
        );
        Ok(Dispatch::Execute(ExecutionRequest {
            kind,
            caller,
            callee,
            value: request.value,
            calldata: request.calldata.clone(),
            max_gas: request.max_gas,
            gas_price: request.gas_price,
            gas_payer: request.gas_payer,
            escrow_key,
            sequence_number,
            request_id: request.request_id(),
        }))
    }
}

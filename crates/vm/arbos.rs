//! The environment driver: admits a request, runs it and folds the result
//! back into the authoritative store.

use arbos_common::{
    Address, Bytes, U256,
    types::{ArbosCode, ArbosGenesis, Receipt, Storage, TxRequest, TxResultCode},
    utils::address_to_word,
};
use arbos_storage::{
    AccountStore, CURRENT_TX_ESCROW_KEY, ChainParameter, ChainParameters, CodeTranslator,
    ExecutionContext, StateError, WorkingCopy, WorldState,
};
use tracing::{debug, error, info, warn};

use crate::{
    dispatcher::{Dispatch, TransactionDispatcher},
    errors::{InitError, InternalError, VMError},
    owner_state::OwnerState,
    precompiles::{PrecompileEnv, PrecompileOutput, execute_precompile, is_precompile},
    substrate::{ExecutionOutcome, ExecutionRequest, Executor, ReceiptJournal},
    upgrade::{ArbosUpgrade, UpgradeController},
};

/// How a call frame ended.
enum CallResult {
    Finished(ExecutionOutcome),
    Upgraded(ArbosUpgrade),
}

pub struct Arbos {
    world: WorldState,
    params: ChainParameters,
    owner_state: OwnerState,
    upgrades: UpgradeController,
    running_code: ArbosCode,
    translator: Box<dyn CodeTranslator>,
}

impl Arbos {
    pub fn new(
        accounts: AccountStore,
        params: ChainParameters,
        translator: Box<dyn CodeTranslator>,
    ) -> Self {
        Self {
            world: WorldState::new(accounts),
            params,
            owner_state: OwnerState::default(),
            upgrades: UpgradeController::default(),
            running_code: ArbosCode::default(),
            translator,
        }
    }

    pub fn from_genesis(
        genesis: &ArbosGenesis,
        translator: Box<dyn CodeTranslator>,
    ) -> Result<Self, InitError> {
        let params = ChainParameters::from_genesis(genesis)?;
        let mut accounts = AccountStore::default();
        for (address, alloc) in &genesis.alloc {
            accounts.credit_balance(*address, alloc.balance)?;
            accounts.set_nonce(*address, alloc.nonce);
            if !alloc.code.is_empty() {
                accounts.deploy_code(*address, alloc.code.clone(), Storage::new(), translator.as_ref())?;
            }
        }
        info!(
            chain_id = params.chain_id(),
            owner = %params.owner(),
            accounts = genesis.alloc.len(),
            contracts = accounts.contract_count(),
            "Initialized chain state from genesis"
        );
        Ok(Self::new(accounts, params, translator))
    }

    pub fn accounts(&self) -> Result<&AccountStore, VMError> {
        Ok(self.world.accounts(&ExecutionContext::top_level())?)
    }

    pub fn accounts_mut(&mut self) -> Result<&mut AccountStore, VMError> {
        Ok(self.world.accounts_mut(&ExecutionContext::top_level())?)
    }

    pub fn params(&self) -> &ChainParameters {
        &self.params
    }

    pub fn owner_state(&self) -> &OwnerState {
        &self.owner_state
    }

    pub fn upgrades(&self) -> &UpgradeController {
        &self.upgrades
    }

    /// Code the environment runs, replaced by each successful upgrade.
    pub fn running_code(&self) -> &ArbosCode {
        &self.running_code
    }

    /// Processes one request to completion and emits exactly one receipt.
    ///
    /// Returns `Err` only for integrity violations; processing must stop then.
    pub fn process_request(
        &mut self,
        request: &TxRequest,
        executor: &mut dyn Executor,
        journal: &mut dyn ReceiptJournal,
    ) -> Result<TxResultCode, VMError> {
        let top = ExecutionContext::top_level();
        let dispatch = TransactionDispatcher::new(&self.params, &self.owner_state).dispatch(
            &mut self.world,
            &top,
            request,
        )?;
        let exec = match dispatch {
            Dispatch::Rejected(result) => {
                journal.emit(Receipt::rejected(request.request_id(), request.caller, result));
                return Ok(result);
            }
            Dispatch::Execute(exec) => exec,
        };

        let mut frame = self.world.enter_call(&top)?;
        let call = match self.run_call(&mut frame, &exec, executor) {
            Ok(call) => call,
            Err(err) if err.is_fatal() => {
                error!(%err, request_id = %exec.request_id, "Halting on integrity violation");
                return Err(err);
            }
            Err(err) => {
                debug!(%err, "Call reverted");
                CallResult::Finished(revert_outcome(err))
            }
        };

        let (outcome, upgrade) = match call {
            CallResult::Finished(outcome) => (outcome, None),
            CallResult::Upgraded(upgrade) => {
                (ExecutionOutcome::success(0, Bytes::new()), Some(upgrade))
            }
        };

        let mut gas_used = outcome.gas_used;
        if outcome.is_success() && !exec.kind.is_static() {
            let storage_gas = self.world.commit(&top, frame)?;
            gas_used = gas_used.saturating_add(storage_gas);
        }
        let gas_used = gas_used.min(exec.max_gas);
        self.settle_gas(&exec, gas_used)?;

        if let Some(upgrade) = upgrade {
            info!(
                code_hash = %upgrade.running.code_hash,
                previous = %self.running_code.code_hash,
                "Switching to upgraded environment code"
            );
            self.running_code = upgrade.running;
        }

        journal.emit(Receipt::new(
            exec.request_id,
            exec.caller,
            outcome.result,
            outcome.output,
            gas_used,
            exec.gas_price,
        ));
        Ok(outcome.result)
    }

    fn run_call(
        &mut self,
        frame: &mut WorkingCopy,
        exec: &ExecutionRequest,
        executor: &mut dyn Executor,
    ) -> Result<CallResult, VMError> {
        match frame
            .accounts_mut()
            .transfer_balance(exec.caller, exec.callee, exec.value)
        {
            Ok(()) => {}
            Err(StateError::InsufficientBalance { balance, needed, .. }) => {
                debug!(caller = %exec.caller, %balance, %needed, "Cannot move call value");
                return Ok(CallResult::Finished(ExecutionOutcome::failure(
                    TxResultCode::InsufficientBalance,
                    0,
                    Bytes::new(),
                )));
            }
            Err(err) => return Err(err.into()),
        }

        if !exec.is_constructor() && is_precompile(&exec.callee) {
            return self.run_precompile(frame, exec, executor);
        }

        let outcome = executor.execute(frame, exec)?;
        if !exec.is_constructor() || !outcome.is_success() {
            return Ok(CallResult::Finished(outcome));
        }

        match frame.deploy_code(exec.callee, outcome.output, Storage::new(), self.translator.as_ref()) {
            Ok(_) => Ok(CallResult::Finished(ExecutionOutcome::success(
                outcome.gas_used,
                Bytes::copy_from_slice(&address_to_word(exec.callee).to_big_endian()),
            ))),
            Err(StateError::ContractAlreadyExists(address)) => {
                warn!(%address, "Constructor target already has code");
                Ok(CallResult::Finished(ExecutionOutcome::failure(
                    TxResultCode::CannotDeployAtAddress,
                    outcome.gas_used,
                    Bytes::new(),
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Runs a precompile against copies of the administrative state, kept only
    /// when the call succeeds and may mutate.
    fn run_precompile(
        &mut self,
        frame: &mut WorkingCopy,
        exec: &ExecutionRequest,
        executor: &mut dyn Executor,
    ) -> Result<CallResult, VMError> {
        let mut params = self.params.clone();
        let mut owner_state = self.owner_state.clone();
        let mut upgrades = self.upgrades.clone();
        let mut env = PrecompileEnv {
            frame,
            caller: exec.caller,
            value: exec.value,
            params: &mut params,
            owner_state: &mut owner_state,
            upgrades: &mut upgrades,
            translator: self.translator.as_ref(),
            executor,
        };
        let output = execute_precompile(exec.callee, &mut env, &exec.calldata)?;
        if !exec.kind.is_static() {
            self.params = params;
            self.owner_state = owner_state;
            self.upgrades = upgrades;
        }
        Ok(match output {
            PrecompileOutput::Return(data) => {
                CallResult::Finished(ExecutionOutcome::success(0, data))
            }
            PrecompileOutput::Upgrade(upgrade) if !exec.kind.is_static() => {
                CallResult::Upgraded(upgrade)
            }
            PrecompileOutput::Upgrade(_) => {
                CallResult::Finished(ExecutionOutcome::success(0, Bytes::new()))
            }
        })
    }

    /// Pays the used gas out of escrow and refunds the rest to whoever funded it.
    fn settle_gas(&mut self, exec: &ExecutionRequest, gas_used: u64) -> Result<(), VMError> {
        if exec.escrow_key == CURRENT_TX_ESCROW_KEY {
            return Ok(());
        }
        let recipient = self.fee_recipient();
        let accounts = self.world.accounts_mut(&ExecutionContext::top_level())?;
        let fee = exec
            .gas_price
            .checked_mul(U256::from(gas_used))
            .ok_or(InternalError::Overflow("gas fee"))?
            .min(accounts.escrow().balance(exec.escrow_key));
        accounts.pay_out_escrow(exec.escrow_key, recipient, fee)?;
        let payer = accounts
            .escrow()
            .payer(exec.escrow_key)
            .unwrap_or(exec.gas_payer);
        let refund = accounts.pay_all_out_escrow(exec.escrow_key, payer)?;
        debug!(key = exec.escrow_key, %fee, %refund, %recipient, %payer, "Settled gas");
        Ok(())
    }

    fn fee_recipient(&self) -> Address {
        let recipient = self.params.get_address(ChainParameter::NetworkFeeRecipient);
        if recipient.is_zero() {
            self.params.owner()
        } else {
            recipient
        }
    }
}

fn revert_outcome(err: VMError) -> ExecutionOutcome {
    let output = match err {
        VMError::Revert(reason) => Bytes::from(reason.into_bytes()),
        err => Bytes::from(err.to_string().into_bytes()),
    };
    ExecutionOutcome::failure(TxResultCode::Revert, 0, output)
}

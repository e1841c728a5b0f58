//! Access discipline for the authoritative [`AccountStore`].
//!
//! Depth 0 is the environment itself and is the only context allowed to touch
//! the authoritative store. A call entered from it works on a [`WorkingCopy`]
//! taken at entry; nested calls copy their parent's copy. Changes flow back
//! one level at a time through [`WorkingCopy::commit_into`] and finally
//! [`WorldState::commit`]. Any other route is an integrity violation.

use arbos_common::{
    Address, Bytes,
    constants::STORAGE_GAS_PER_CODE_BYTE,
    types::{CompiledCode, Storage},
};
use tracing::error;

use crate::{account_store::AccountStore, error::StateError, translator::CodeTranslator};

/// Depth of the environment itself.
pub const TOP_LEVEL_DEPTH: usize = 0;

/// Identifies who is asking for state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    depth: usize,
}

impl ExecutionContext {
    pub const fn top_level() -> Self {
        Self {
            depth: TOP_LEVEL_DEPTH,
        }
    }

    pub const fn at_depth(depth: usize) -> Self {
        Self { depth }
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn is_top_level(&self) -> bool {
        self.depth == TOP_LEVEL_DEPTH
    }
}

/// Owner of the authoritative account store.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    accounts: AccountStore,
}

impl WorldState {
    pub fn new(accounts: AccountStore) -> Self {
        Self { accounts }
    }

    fn check(ctx: &ExecutionContext) -> Result<(), StateError> {
        if ctx.is_top_level() {
            return Ok(());
        }
        error!(depth = ctx.depth(), "Authoritative account store accessed from a nested context");
        Err(StateError::NestedContextAccess(ctx.depth()))
    }

    pub fn accounts(&self, ctx: &ExecutionContext) -> Result<&AccountStore, StateError> {
        Self::check(ctx)?;
        Ok(&self.accounts)
    }

    pub fn accounts_mut(&mut self, ctx: &ExecutionContext) -> Result<&mut AccountStore, StateError> {
        Self::check(ctx)?;
        Ok(&mut self.accounts)
    }

    /// Opens the outermost call frame on a copy of the authoritative store.
    pub fn enter_call(&self, ctx: &ExecutionContext) -> Result<WorkingCopy, StateError> {
        Self::check(ctx)?;
        Ok(WorkingCopy {
            depth: TOP_LEVEL_DEPTH + 1,
            accounts: self.accounts.clone(),
            storage_gas: 0,
        })
    }

    /// Makes the changes of an outermost call frame authoritative.
    pub fn commit(&mut self, ctx: &ExecutionContext, copy: WorkingCopy) -> Result<u64, StateError> {
        Self::check(ctx)?;
        if copy.depth != TOP_LEVEL_DEPTH + 1 {
            error!(child = copy.depth, "Only an outermost call frame can be committed");
            return Err(StateError::CommitDepthMismatch {
                parent: TOP_LEVEL_DEPTH,
                child: copy.depth,
            });
        }
        self.accounts = copy.accounts;
        Ok(copy.storage_gas)
    }
}

/// Isolated account store of one call frame.
#[derive(Clone, Debug)]
pub struct WorkingCopy {
    depth: usize,
    accounts: AccountStore,
    storage_gas: u64,
}

impl WorkingCopy {
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::at_depth(self.depth)
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut AccountStore {
        &mut self.accounts
    }

    /// Storage gas charged to this frame so far.
    pub fn storage_gas(&self) -> u64 {
        self.storage_gas
    }

    pub fn charge_storage(&mut self, gas: u64) -> Result<(), StateError> {
        self.storage_gas = self
            .storage_gas
            .checked_add(gas)
            .ok_or(StateError::Overflow("storage gas"))?;
        Ok(())
    }

    /// Opens a nested call frame on a copy of this one.
    pub fn enter_nested(&self) -> WorkingCopy {
        WorkingCopy {
            depth: self.depth + 1,
            accounts: self.accounts.clone(),
            storage_gas: 0,
        }
    }

    /// Folds a returning child frame into this one.
    pub fn commit_into(&mut self, child: WorkingCopy) -> Result<(), StateError> {
        if child.depth != self.depth + 1 {
            error!(parent = self.depth, child = child.depth, "Call frame committed out of order");
            return Err(StateError::CommitDepthMismatch {
                parent: self.depth,
                child: child.depth,
            });
        }
        self.accounts = child.accounts;
        self.charge_storage(child.storage_gas)
    }

    /// [`AccountStore::create_from_code`], charging this frame for the code's storage.
    pub fn create_from_code(
        &mut self,
        address: Address,
        code: Bytes,
        compiled: CompiledCode,
        storage: Storage,
    ) -> Result<(), StateError> {
        let charge = storage_charge(&code)?;
        self.accounts.create_from_code(address, code, compiled, storage)?;
        self.charge_storage(charge)
    }

    /// [`AccountStore::deploy_code`], charging this frame for the code's storage.
    pub fn deploy_code(
        &mut self,
        address: Address,
        code: Bytes,
        storage: Storage,
        translator: &dyn CodeTranslator,
    ) -> Result<CompiledCode, StateError> {
        let charge = storage_charge(&code)?;
        let compiled = self.accounts.deploy_code(address, code, storage, translator)?;
        self.charge_storage(charge)?;
        Ok(compiled)
    }
}

fn storage_charge(code: &Bytes) -> Result<u64, StateError> {
    u64::try_from(code.len())
        .ok()
        .and_then(|len| len.checked_mul(STORAGE_GAS_PER_CODE_BYTE))
        .ok_or(StateError::Overflow("storage charge"))
}

use arbos_common::{
    Address, Bytes, U256,
    types::{Account, AggregatorInfo, CompiledCode, ContractInfo, Storage},
    utils::keccak,
};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::{
    code_refs::CodeRefTable, error::StateError, escrow::EscrowStore,
    translator::CodeTranslator,
};

/// Authoritative mapping from address to [`Account`], plus the code cache and
/// escrow that live alongside it.
///
/// Absent accounts read as pristine. `contract_count` always equals the
/// number of accounts carrying a [`ContractInfo`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountStore {
    accounts: FxHashMap<Address, Account>,
    code_refs: CodeRefTable,
    contract_count: u64,
    pub(crate) escrow: EscrowStore,
}

impl AccountStore {
    // ================== Accessors =====================

    /// Returns the account at `address`, or a pristine one if it was never written.
    pub fn get(&self, address: Address) -> Account {
        self.accounts
            .get(&address)
            .cloned()
            .unwrap_or_else(|| Account::pristine(address))
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map_or(0, |account| account.nonce)
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map_or(U256::zero(), |account| account.balance)
    }

    pub fn has_contract(&self, address: Address) -> bool {
        self.accounts
            .get(&address)
            .is_some_and(|account| account.has_code())
    }

    pub fn contract_count(&self) -> u64 {
        self.contract_count
    }

    pub fn code_refs(&self) -> &CodeRefTable {
        &self.code_refs
    }

    pub fn escrow(&self) -> &EscrowStore {
        &self.escrow
    }

    /// Sum of all account balances.
    pub fn total_balance(&self) -> Result<U256, StateError> {
        self.accounts.values().try_fold(U256::zero(), |acc, account| {
            acc.checked_add(account.balance)
                .ok_or(StateError::Overflow("total balance"))
        })
    }

    // ================== Writes =====================

    /// Replaces the account at `address`. Keeps the contract count in sync
    /// when the write adds or removes contract info.
    pub fn set(&mut self, address: Address, mut account: Account) {
        account.address = address;
        let had_contract = self.has_contract(address);
        let has_contract = account.has_code();

        if account == Account::pristine(address) {
            self.accounts.remove(&address);
        } else {
            self.accounts.insert(address, account);
        }

        match (had_contract, has_contract) {
            (false, true) => self.contract_count += 1,
            (true, false) => self.contract_count = self.contract_count.saturating_sub(1),
            _ => {}
        }
    }

    fn update<T>(&mut self, address: Address, f: impl FnOnce(&mut Account) -> T) -> T {
        let mut account = self.get(address);
        let result = f(&mut account);
        self.set(address, account);
        result
    }

    /// Returns the current sequence number of `address` and advances it by one.
    pub fn fetch_and_increment_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        let current = self.nonce(address);
        let next = current
            .checked_add(1)
            .ok_or(StateError::Overflow("account nonce"))?;
        self.update(address, |account| account.nonce = next);
        Ok(current)
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.update(address, |account| account.nonce = nonce);
    }

    pub fn credit_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self
            .balance(address)
            .checked_add(amount)
            .ok_or(StateError::Overflow("account balance"))?;
        self.update(address, |account| account.balance = balance);
        Ok(())
    }

    pub fn debit_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        if amount.is_zero() {
            return Ok(());
        }
        let current = self.balance(address);
        let balance = current
            .checked_sub(amount)
            .ok_or(StateError::InsufficientBalance {
                address,
                balance: current,
                needed: amount,
            })?;
        self.update(address, |account| account.balance = balance);
        Ok(())
    }

    /// Moves `amount` from `from` to `to`. Either both balances change or neither does.
    /// Zero amounts and self transfers succeed without touching the store.
    pub fn transfer_balance(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), StateError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        if self.balance(to).checked_add(amount).is_none() {
            return Err(StateError::Overflow("account balance"));
        }
        self.debit_balance(from, amount)?;
        self.credit_balance(to, amount)
    }

    pub fn get_storage(&self, address: Address, key: U256) -> U256 {
        self.accounts
            .get(&address)
            .and_then(|account| account.contract.as_ref())
            .and_then(|contract| contract.storage.get(&key))
            .copied()
            .unwrap_or_default()
    }

    /// Writes a storage cell. Returns `false` if there's no contract at `address`.
    pub fn set_storage(&mut self, address: Address, key: U256, value: U256) -> bool {
        let Some(contract) = self
            .accounts
            .get_mut(&address)
            .and_then(|account| account.contract.as_mut())
        else {
            return false;
        };
        if value.is_zero() {
            contract.storage.remove(&key);
        } else {
            contract.storage.insert(key, value);
        }
        true
    }

    pub fn set_aggregator_info(&mut self, address: Address, info: Option<AggregatorInfo>) {
        self.update(address, |account| account.aggregator = info);
    }

    // ================== Contract lifecycle =====================

    /// Installs already translated code at `address`.
    ///
    /// Fails if a contract already lives there; existing contracts are never overwritten.
    pub fn create_from_code(
        &mut self,
        address: Address,
        code: Bytes,
        compiled: CompiledCode,
        storage: Storage,
    ) -> Result<(), StateError> {
        if self.has_contract(address) {
            return Err(StateError::ContractAlreadyExists(address));
        }
        let code_hash = keccak(&code);
        self.update(address, |account| {
            account.contract = Some(ContractInfo {
                code,
                code_hash,
                jump_table: compiled.jump_table,
                entry_point: compiled.entry_point,
                storage,
            })
        });
        info!(%address, %code_hash, contracts = self.contract_count, "Created contract");
        Ok(())
    }

    /// Translates (or reuses) `code` and installs it at `address`.
    /// The code reference taken is released again if the address is occupied.
    pub fn deploy_code(
        &mut self,
        address: Address,
        code: Bytes,
        storage: Storage,
        translator: &dyn CodeTranslator,
    ) -> Result<CompiledCode, StateError> {
        if self.has_contract(address) {
            return Err(StateError::ContractAlreadyExists(address));
        }
        let (code_hash, compiled) = self.code_refs.add_or_create(&code, translator)?;
        if let Err(err) = self.create_from_code(address, code, compiled.clone(), storage) {
            self.code_refs.drop_ref(&code_hash);
            return Err(err);
        }
        Ok(compiled)
    }

    /// Replaces the code at `address`, keeping its storage when a contract was already there.
    pub fn upgrade_contract_from_code(
        &mut self,
        address: Address,
        code: Bytes,
        compiled: CompiledCode,
    ) {
        let code_hash = keccak(&code);
        let previous = self.get(address).contract;
        let storage = match previous {
            Some(previous) => {
                self.code_refs.drop_ref(&previous.code_hash);
                previous.storage
            }
            None => Storage::new(),
        };
        self.update(address, |account| {
            account.contract = Some(ContractInfo {
                code,
                code_hash,
                jump_table: compiled.jump_table,
                entry_point: compiled.entry_point,
                storage,
            })
        });
        info!(%address, %code_hash, "Upgraded contract code");
    }

    /// Like [`Self::upgrade_contract_from_code`], translating through the code cache.
    pub fn upgrade_code(
        &mut self,
        address: Address,
        code: Bytes,
        translator: &dyn CodeTranslator,
    ) -> Result<CompiledCode, StateError> {
        let (_, compiled) = self.code_refs.add_or_create(&code, translator)?;
        self.upgrade_contract_from_code(address, code, compiled.clone());
        Ok(compiled)
    }

    /// Resets `address` to a pristine account and releases its code reference.
    pub fn destroy_account(&mut self, address: Address) {
        if let Some(code_hash) = self.accounts.get(&address).and_then(Account::code_hash) {
            self.code_refs.drop_ref(&code_hash);
        }
        self.set(address, Account::pristine(address));
        debug!(%address, "Destroyed account");
    }
}

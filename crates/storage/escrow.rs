use arbos_common::{Address, U256};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{account_store::AccountStore, error::StateError};

pub type EscrowKey = u64;

/// Reserved key standing for the current transaction's own gas funds.
/// [`AccountStore::open_escrow`] hands it out for zero amounts and never allocates it.
pub const CURRENT_TX_ESCROW_KEY: EscrowKey = 0;

/// Funds set aside under numeric keys.
///
/// Keys are handed out in increasing order and never reused. A drained entry
/// stays behind as a zero record. Each allocated key remembers who funded it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscrowStore {
    next_key: EscrowKey,
    balances: FxHashMap<EscrowKey, U256>,
    payers: FxHashMap<EscrowKey, Address>,
}

impl Default for EscrowStore {
    fn default() -> Self {
        Self {
            next_key: 1,
            balances: FxHashMap::default(),
            payers: FxHashMap::default(),
        }
    }
}

impl EscrowStore {
    pub fn next_key(&self) -> EscrowKey {
        self.next_key
    }

    pub fn balance(&self, key: EscrowKey) -> U256 {
        self.balances.get(&key).copied().unwrap_or_default()
    }

    pub fn contains(&self, key: EscrowKey) -> bool {
        self.balances.contains_key(&key)
    }

    /// Whether `key` was handed out by [`AccountStore::open_escrow`].
    pub fn is_allocated(&self, key: EscrowKey) -> bool {
        key != CURRENT_TX_ESCROW_KEY && key < self.next_key
    }

    /// Account that opened escrow `key`.
    pub fn payer(&self, key: EscrowKey) -> Option<Address> {
        self.payers.get(&key).copied()
    }

    /// Sum of all escrowed funds.
    pub fn total(&self) -> Result<U256, StateError> {
        self.balances.values().try_fold(U256::zero(), |acc, amount| {
            acc.checked_add(*amount)
                .ok_or(StateError::Overflow("escrow total"))
        })
    }

    fn allocate(&mut self, payer: Address, amount: U256) -> Result<EscrowKey, StateError> {
        let key = self.next_key;
        self.next_key = key
            .checked_add(1)
            .ok_or(StateError::Overflow("escrow key"))?;
        self.credit(key, amount)?;
        self.payers.insert(key, payer);
        Ok(key)
    }

    fn credit(&mut self, key: EscrowKey, amount: U256) -> Result<(), StateError> {
        let entry = self.balances.entry(key).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(StateError::Overflow("escrow balance"))?;
        Ok(())
    }

    fn debit(&mut self, key: EscrowKey, amount: U256) -> Result<(), StateError> {
        let available = self.balance(key);
        let remaining = available
            .checked_sub(amount)
            .ok_or(StateError::InsufficientEscrow {
                key,
                available,
                requested: amount,
            })?;
        self.balances.insert(key, remaining);
        Ok(())
    }
}

impl AccountStore {
    /// Moves `amount` from `payer` into a fresh escrow entry and returns its key.
    ///
    /// A zero amount returns [`CURRENT_TX_ESCROW_KEY`] without touching anything.
    pub fn open_escrow(&mut self, payer: Address, amount: U256) -> Result<EscrowKey, StateError> {
        if amount.is_zero() {
            return Ok(CURRENT_TX_ESCROW_KEY);
        }
        if self.balance(payer) < amount {
            return Err(StateError::InsufficientBalance {
                address: payer,
                balance: self.balance(payer),
                needed: amount,
            });
        }
        let key = self.escrow.allocate(payer, amount)?;
        self.debit_balance(payer, amount)?;
        debug!(key, %payer, %amount, "Opened escrow");
        Ok(key)
    }

    /// Moves up to `max_amount` from `payer` into escrow `key`, limited by the
    /// payer's balance. Returns the amount actually moved.
    ///
    /// Keys that were never allocated receive nothing.
    pub fn add_to_escrow_up_to(
        &mut self,
        key: EscrowKey,
        payer: Address,
        max_amount: U256,
    ) -> Result<U256, StateError> {
        if !self.escrow.is_allocated(key) {
            debug!(key, %payer, "Top-up of unallocated escrow ignored");
            return Ok(U256::zero());
        }
        let amount = self.get(payer).balance.min(max_amount);
        if amount.is_zero() {
            return Ok(U256::zero());
        }
        self.escrow.credit(key, amount)?;
        self.debit_balance(payer, amount)?;
        Ok(amount)
    }

    /// Pays `amount` out of escrow `key` to `recipient`. Fails without side
    /// effects if the entry holds less than `amount`.
    pub fn pay_out_escrow(
        &mut self,
        key: EscrowKey,
        recipient: Address,
        amount: U256,
    ) -> Result<(), StateError> {
        let available = self.escrow.balance(key);
        if available < amount {
            return Err(StateError::InsufficientEscrow {
                key,
                available,
                requested: amount,
            });
        }
        self.credit_balance(recipient, amount)?;
        self.escrow.debit(key, amount)
    }

    /// Pays everything left in escrow `key` to `recipient`, leaving a zero record.
    pub fn pay_all_out_escrow(
        &mut self,
        key: EscrowKey,
        recipient: Address,
    ) -> Result<U256, StateError> {
        let amount = self.escrow.balance(key);
        self.credit_balance(recipient, amount)?;
        self.escrow.balances.insert(key, U256::zero());
        Ok(amount)
    }
}

use std::collections::BTreeSet;

use arbos_common::{Address, U256, constants::SYSTEM_ADDRESS};
use tracing::info;

/// Administrative state changed through `ArbOwner`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerState {
    /// `None` lets everyone send.
    allowed_senders: Option<BTreeSet<Address>>,
    fair_gas_price_senders: BTreeSet<Address>,
    l1_gas_price_estimate: U256,
    reserve_funds: U256,
}

impl OwnerState {
    /// The system sentinel and the chain owner may always send.
    pub fn is_allowed_sender(&self, sender: Address, owner: Address) -> bool {
        if sender == SYSTEM_ADDRESS || sender == owner {
            return true;
        }
        self.allowed_senders
            .as_ref()
            .is_none_or(|allowed| allowed.contains(&sender))
    }

    pub fn allows_all_senders(&self) -> bool {
        self.allowed_senders.is_none()
    }

    pub fn allow_all_senders(&mut self) {
        self.allowed_senders = None;
        info!("Sender allow-list disabled");
    }

    pub fn allow_only_owner_to_send(&mut self) {
        self.allowed_senders = Some(BTreeSet::new());
        info!("Sender allow-list restricted to the owner");
    }

    /// Adds `sender` to the allow-list. No effect while everyone may send.
    pub fn add_allowed_sender(&mut self, sender: Address) {
        if let Some(allowed) = self.allowed_senders.as_mut() {
            allowed.insert(sender);
            info!(%sender, "Allowed sender added");
        }
    }

    pub fn remove_allowed_sender(&mut self, sender: Address) {
        if let Some(allowed) = self.allowed_senders.as_mut() {
            allowed.remove(&sender);
            info!(%sender, "Allowed sender removed");
        }
    }

    pub fn allowed_senders(&self) -> impl Iterator<Item = &Address> {
        self.allowed_senders.iter().flatten()
    }

    pub fn set_fair_gas_price_sender(&mut self, sender: Address, fair: bool) {
        if fair {
            self.fair_gas_price_senders.insert(sender);
        } else {
            self.fair_gas_price_senders.remove(&sender);
        }
    }

    pub fn is_fair_gas_price_sender(&self, sender: Address) -> bool {
        self.fair_gas_price_senders.contains(&sender)
    }

    pub fn fair_gas_price_senders(&self) -> impl Iterator<Item = &Address> {
        self.fair_gas_price_senders.iter()
    }

    pub fn l1_gas_price_estimate(&self) -> U256 {
        self.l1_gas_price_estimate
    }

    pub fn set_l1_gas_price_estimate(&mut self, price: U256) {
        self.l1_gas_price_estimate = price;
    }

    pub fn reserve_funds(&self) -> U256 {
        self.reserve_funds
    }

    /// Returns `false` if the reserve would overflow.
    pub fn add_to_reserve_funds(&mut self, amount: U256) -> bool {
        match self.reserve_funds.checked_add(amount) {
            Some(total) => {
                self.reserve_funds = total;
                true
            }
            None => false,
        }
    }
}

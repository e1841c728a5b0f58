use arbos_common::{Address, H256, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Insufficient balance in {address:#x}: has {balance}, needs {needed}")]
    InsufficientBalance {
        address: Address,
        balance: U256,
        needed: U256,
    },
    #[error("Escrow {key} holds {available}, cannot pay out {requested}")]
    InsufficientEscrow {
        key: u64,
        available: U256,
        requested: U256,
    },
    #[error("A contract already exists at {0:#x}")]
    ContractAlreadyExists(Address),
    #[error("Authoritative account store accessed from call depth {0}")]
    NestedContextAccess(usize),
    #[error("Cannot commit a depth {child} working copy into depth {parent}")]
    CommitDepthMismatch { parent: usize, child: usize },
    #[error("Failed to translate code {0:#x}: {1}")]
    Translation(H256, String),
    #[error("Arithmetic overflow: {0}")]
    Overflow(&'static str),
}

impl StateError {
    /// Integrity violations that must halt processing instead of producing a receipt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StateError::NestedContextAccess(_)
                | StateError::CommitDepthMismatch { .. }
                | StateError::Overflow(_)
        )
    }
}

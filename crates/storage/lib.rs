//! # arbos-storage
//!
//! Authoritative world state of the chain: accounts, the translated code
//! cache, gas escrow and chain parameters, together with the rules for who
//! may read or write them.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`account_store`] | [`AccountStore`]: accounts, contract lifecycle and balances |
//! | [`code_refs`] | Reference-counted cache of translated code |
//! | [`escrow`] | Keyed gas escrow |
//! | [`params`] | Chain parameters |
//! | [`context`] | Top-level store guard and per-call working copies |
//! | [`translator`] | The [`CodeTranslator`] seam |

pub mod account_store;
pub mod code_refs;
pub mod context;
pub mod error;
pub mod escrow;
pub mod params;
pub mod translator;

pub use account_store::AccountStore;
pub use code_refs::{CodeRef, CodeRefTable};
pub use context::{ExecutionContext, TOP_LEVEL_DEPTH, WorkingCopy, WorldState};
pub use error::StateError;
pub use escrow::{CURRENT_TX_ESCROW_KEY, EscrowKey, EscrowStore};
pub use params::{ChainParameter, ChainParameters, ParameterError};
pub use translator::{CodeTranslator, JumpDestTranslator, TranslationError};

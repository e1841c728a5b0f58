use arbos_storage::{ParameterError, StateError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// The call failed in an expected way. State changes of the frame are discarded.
    #[error("Revert: {0}")]
    Revert(String),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl VMError {
    pub fn revert(reason: impl Into<String>) -> Self {
        VMError::Revert(reason.into())
    }

    /// Whether processing must halt instead of reporting a failed call.
    pub fn is_fatal(&self) -> bool {
        match self {
            VMError::Revert(_) => false,
            VMError::Internal(_) => true,
            VMError::State(err) => err.is_fatal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
    #[error("Code upgrade attempted from call depth {0}")]
    UpgradeFromNestedCall(usize),
    #[error("Translator failed on the environment's own code: {0}")]
    Translation(String),
}

/// Failure to build the initial environment from a genesis config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("Invalid chain parameter: {0}")]
    Parameter(#[from] ParameterError),
    #[error("Invalid genesis account: {0}")]
    State(#[from] StateError),
}

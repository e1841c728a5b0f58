//! Transaction admission, owner administration and the environment driver.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`dispatcher`] | admission of requests into [`Dispatch`] outcomes |
//! | [`upgrade`] | chunked upload and hash-checked replacement of the environment code |
//! | [`precompiles`] | `ArbOwner` and `ArbGasInfo` |
//! | [`arbos`] | [`Arbos::process_request`], folding outcomes back into the store |
//! | [`substrate`] | seams to the interpreter and the receipt journal |

pub mod arbos;
pub mod calldata;
pub mod dispatcher;
pub mod errors;
pub mod fees;
pub mod owner_state;
pub mod precompiles;
pub mod substrate;
pub mod upgrade;

pub use arbos::Arbos;
pub use dispatcher::{Dispatch, TransactionDispatcher};
pub use errors::{InitError, InternalError, VMError};
pub use fees::{FeeSchedule, PricesInWei};
pub use owner_state::OwnerState;
pub use precompiles::{PrecompileEnv, PrecompileOutput, execute_precompile, is_precompile};
pub use substrate::{
    ExecutionOutcome, ExecutionRequest, Executor, NoInterpreter, ReceiptJournal,
};
pub use upgrade::{ArbosUpgrade, CodeUpload, UpgradeController, UpgradeError};

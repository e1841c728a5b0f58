mod account;
mod code;
mod genesis;
mod receipt;
mod transaction;

pub use account::*;
pub use code::*;
pub use genesis::*;
pub use receipt::*;
pub use transaction::*;

use std::collections::BTreeMap;

use ethereum_types::H256;
use serde::{Deserialize, Serialize};

/// A location inside translated (executable) code.
///
/// `segment` identifies the translated code body, `pc` the offset inside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodePoint {
    pub segment: H256,
    pub pc: u32,
}

impl CodePoint {
    pub const fn new(segment: H256, pc: u32) -> Self {
        Self { segment, pc }
    }
}

/// Maps an EVM program counter to the translated code point that implements it.
pub type JumpTable = BTreeMap<u32, CodePoint>;

/// Output of translating EVM bytecode into executable code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledCode {
    pub entry_point: CodePoint,
    pub jump_table: JumpTable,
}

/// Code the environment itself is running. Replaced wholesale by an upgrade.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbosCode {
    pub code_hash: H256,
    pub entry_point: CodePoint,
}

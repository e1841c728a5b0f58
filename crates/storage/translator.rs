use arbos_common::{
    H256,
    types::{CodePoint, CompiledCode, JumpTable},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TranslationError(pub String);

/// Turns EVM bytecode into executable code.
///
/// Called by the code cache only on a miss, so implementations may be slow.
pub trait CodeTranslator {
    fn translate(&self, code_hash: H256, code: &[u8]) -> Result<CompiledCode, TranslationError>;
}

const JUMPDEST: u8 = 0x5b;
const PUSH1: u8 = 0x60;
const PUSH32: u8 = 0x7f;

/// Translator that keeps the EVM code as the executable body.
///
/// Every valid `JUMPDEST` becomes a jump table entry pointing at the same
/// offset in a segment named after the code hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct JumpDestTranslator;

impl CodeTranslator for JumpDestTranslator {
    fn translate(&self, code_hash: H256, code: &[u8]) -> Result<CompiledCode, TranslationError> {
        if u32::try_from(code.len()).is_err() {
            return Err(TranslationError(format!(
                "code of {} bytes does not fit a 32-bit program counter",
                code.len()
            )));
        }

        let mut jump_table = JumpTable::new();
        let mut pc = 0usize;
        while let Some(&opcode) = code.get(pc) {
            if opcode == JUMPDEST {
                let Ok(at) = u32::try_from(pc) else {
                    break;
                };
                jump_table.insert(at, CodePoint::new(code_hash, at));
            }
            if (PUSH1..=PUSH32).contains(&opcode) {
                pc += usize::from(opcode - PUSH1) + 1;
            }
            pc += 1;
        }

        Ok(CompiledCode {
            entry_point: CodePoint::new(code_hash, 0),
            jump_table,
        })
    }
}

//! Content-addressed cache of translated contract code.
//!
//! Contracts that share bytecode share one entry, so each distinct code body
//! is translated once. Reference counts are advisory: a count that drifts
//! only causes a redundant translation or an entry that outlives its last
//! user. Nothing reads the count to decide what a contract executes.

use arbos_common::{
    Bytes, H256,
    types::{CodePoint, CompiledCode, JumpTable},
    utils::keccak,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::StateError, translator::CodeTranslator};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRef {
    pub ref_count: u64,
    pub code: Bytes,
    pub jump_table: JumpTable,
    pub entry_point: CodePoint,
}

impl CodeRef {
    pub fn compiled(&self) -> CompiledCode {
        CompiledCode {
            entry_point: self.entry_point,
            jump_table: self.jump_table.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeRefTable {
    refs: FxHashMap<H256, CodeRef>,
}

impl CodeRefTable {
    pub fn get(&self, code_hash: &H256) -> Option<&CodeRef> {
        self.refs.get(code_hash)
    }

    pub fn ref_count(&self, code_hash: &H256) -> u64 {
        self.refs.get(code_hash).map_or(0, |code_ref| code_ref.ref_count)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Takes a reference to `code`, translating it only if no entry exists for its hash.
    /// Returns the code hash together with the translation.
    pub fn add_or_create(
        &mut self,
        code: &Bytes,
        translator: &dyn CodeTranslator,
    ) -> Result<(H256, CompiledCode), StateError> {
        let code_hash = keccak(code);

        if let Some(code_ref) = self.refs.get_mut(&code_hash) {
            code_ref.ref_count = code_ref
                .ref_count
                .checked_add(1)
                .ok_or(StateError::Overflow("code ref count"))?;
            debug!(%code_hash, ref_count = code_ref.ref_count, "Reusing translated code");
            return Ok((code_hash, code_ref.compiled()));
        }

        let compiled = translator
            .translate(code_hash, code)
            .map_err(|err| StateError::Translation(code_hash, err.0))?;
        debug!(%code_hash, len = code.len(), "Translated new code");
        self.refs.insert(
            code_hash,
            CodeRef {
                ref_count: 1,
                code: code.clone(),
                jump_table: compiled.jump_table.clone(),
                entry_point: compiled.entry_point,
            },
        );
        Ok((code_hash, compiled))
    }

    /// Releases one reference. The entry is removed when its count reaches zero.
    /// Unknown hashes are ignored.
    pub fn drop_ref(&mut self, code_hash: &H256) {
        let Some(code_ref) = self.refs.get_mut(code_hash) else {
            return;
        };
        if code_ref.ref_count > 1 {
            code_ref.ref_count -= 1;
        } else {
            self.refs.remove(code_hash);
            debug!(%code_hash, "Evicted translated code");
        }
    }
}

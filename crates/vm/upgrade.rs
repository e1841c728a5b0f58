//! Owner-driven replacement of the environment's own code.
//!
//! The code arrives over several messages. A [`CodeUpload`] accumulates the
//! chunks together with a running keccak, and finishing the upload checks the
//! result against the hash the owner committed to before anything changes.

use arbos_common::{Bytes, H256, types::ArbosCode};
use arbos_storage::{CodeTranslator, ExecutionContext, TOP_LEVEL_DEPTH};
use sha3::{Digest, Keccak256};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::calldata::decode_length_prefixed;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    #[error("No code upload in progress")]
    NoUploadInProgress,
    #[error("Malformed code chunk")]
    MalformedChunk,
    #[error("Previous upgrade hash mismatch: expected {expected:#x}, last upgrade was {last:#x}")]
    OldHashMismatch { expected: H256, last: H256 },
    #[error("Uploaded code hash mismatch: expected {expected:#x}, uploaded {uploaded:#x}")]
    NewHashMismatch { expected: H256, uploaded: H256 },
    #[error("Upgrade can only be finished from call depth 1, not {0}")]
    NestedCall(usize),
    #[error("Uploaded code failed to translate: {0}")]
    Translation(String),
}

impl UpgradeError {
    /// A finish from the wrong depth means the caller bypassed the call path.
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpgradeError::NestedCall(_))
    }
}

/// Code accumulated so far and its running hash.
#[derive(Clone, Default)]
pub struct CodeUpload {
    code: Vec<u8>,
    hasher: Keccak256,
}

impl std::fmt::Debug for CodeUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeUpload")
            .field("len", &self.code.len())
            .field("hash", &self.hash())
            .finish()
    }
}

impl CodeUpload {
    pub fn append(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.code.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn hash(&self) -> H256 {
        H256::from_slice(&self.hasher.clone().finalize())
    }

    pub fn finalize(self) -> Bytes {
        Bytes::from(self.code)
    }
}

/// A finished upgrade, ready to replace the running code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArbosUpgrade {
    pub code: Bytes,
    pub running: ArbosCode,
}

#[derive(Clone, Debug, Default)]
pub struct UpgradeController {
    upload: Option<CodeUpload>,
    last_upgrade_hash: H256,
}

impl UpgradeController {
    /// Starts a fresh upload. An upload already in progress is dropped.
    pub fn start_code_upload(&mut self) {
        if let Some(previous) = self.upload.replace(CodeUpload::default()) {
            warn!(discarded_len = previous.len(), "Discarding code upload in progress");
        }
        debug!("Code upload started");
    }

    /// Like [`Self::start_code_upload`], only when `old_hash` is zero or the last upgrade's hash.
    pub fn start_code_upload_with_check(&mut self, old_hash: H256) -> Result<(), UpgradeError> {
        self.check_old_hash(old_hash)?;
        self.start_code_upload();
        Ok(())
    }

    /// Appends a length-prefixed chunk: a 32-byte big-endian length followed by the data.
    pub fn continue_code_upload(&mut self, chunk: &[u8]) -> Result<(), UpgradeError> {
        let upload = self
            .upload
            .as_mut()
            .ok_or(UpgradeError::NoUploadInProgress)?;
        let data = decode_length_prefixed(chunk).ok_or(UpgradeError::MalformedChunk)?;
        upload.append(data);
        debug!(chunk_len = data.len(), total_len = upload.len(), "Code chunk uploaded");
        Ok(())
    }

    pub fn uploaded_code_hash(&self) -> Result<H256, UpgradeError> {
        self.upload
            .as_ref()
            .map(CodeUpload::hash)
            .ok_or(UpgradeError::NoUploadInProgress)
    }

    pub fn is_uploading(&self) -> bool {
        self.upload.is_some()
    }

    pub fn last_upgrade_hash(&self) -> H256 {
        self.last_upgrade_hash
    }

    /// Verifies and commits the upload. Only callable from depth 1.
    ///
    /// Nothing changes unless every check passes, so a mismatched hash leaves
    /// the upload in place for another attempt.
    pub fn finish_code_upload_as_arbos_upgrade(
        &mut self,
        ctx: &ExecutionContext,
        new_hash: H256,
        old_hash: H256,
        translator: &dyn CodeTranslator,
    ) -> Result<ArbosUpgrade, UpgradeError> {
        if ctx.depth() != TOP_LEVEL_DEPTH + 1 {
            error!(depth = ctx.depth(), "Upgrade finish attempted from a nested call");
            return Err(UpgradeError::NestedCall(ctx.depth()));
        }
        self.check_old_hash(old_hash)?;
        let upload = self.upload.as_ref().ok_or(UpgradeError::NoUploadInProgress)?;
        let uploaded = upload.hash();
        if uploaded != new_hash {
            warn!(expected = %new_hash, %uploaded, "Uploaded code hash mismatch");
            return Err(UpgradeError::NewHashMismatch {
                expected: new_hash,
                uploaded,
            });
        }
        let compiled = translator
            .translate(new_hash, &upload.code)
            .map_err(|err| UpgradeError::Translation(err.0))?;
        let code = self
            .upload
            .take()
            .map(CodeUpload::finalize)
            .unwrap_or_default();

        self.last_upgrade_hash = new_hash;
        info!(code_hash = %new_hash, len = code.len(), "Environment code upgraded");
        Ok(ArbosUpgrade {
            code,
            running: ArbosCode {
                code_hash: new_hash,
                entry_point: compiled.entry_point,
            },
        })
    }

    fn check_old_hash(&self, old_hash: H256) -> Result<(), UpgradeError> {
        if old_hash.is_zero() || old_hash == self.last_upgrade_hash {
            return Ok(());
        }
        warn!(expected = %old_hash, last = %self.last_upgrade_hash, "Previous upgrade hash mismatch");
        Err(UpgradeError::OldHashMismatch {
            expected: old_hash,
            last: self.last_upgrade_hash,
        })
    }
}

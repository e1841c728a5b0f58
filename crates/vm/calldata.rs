//! Minimal ABI support for the native precompiles.

use arbos_common::{
    Bytes, H256, U256,
    constants::WORD_SIZE,
    utils::{address_to_word, keccak, word_to_address},
};
use ethereum_types::Address;

use crate::errors::VMError;

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Bytes(Bytes),
    FixedBytes(H256),
}

pub fn compute_function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak(signature.as_bytes());
    let mut selector = [0; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

pub fn encode_calldata(signature: &str, values: &[Value]) -> Bytes {
    let mut calldata = compute_function_selector(signature).to_vec();
    calldata.extend_from_slice(&encode_tuple(values));
    Bytes::from(calldata)
}

/// Head/tail encoding of a flat argument list. Every head is one word;
/// dynamic values store the offset of their tail.
pub fn encode_tuple(values: &[Value]) -> Vec<u8> {
    let mut head = Vec::with_capacity(values.len() * WORD_SIZE);
    let mut tail = Vec::new();
    let head_size = values.len() * WORD_SIZE;

    for value in values {
        match value {
            Value::Address(address) => head.extend_from_slice(&address_to_word(*address).to_big_endian()),
            Value::Uint(number) => head.extend_from_slice(&number.to_big_endian()),
            Value::Bool(flag) => {
                head.extend_from_slice(&U256::from(u8::from(*flag)).to_big_endian())
            }
            Value::FixedBytes(word) => head.extend_from_slice(word.as_bytes()),
            Value::Bytes(bytes) => {
                let offset = U256::from(head_size + tail.len());
                head.extend_from_slice(&offset.to_big_endian());
                tail.extend_from_slice(&encode_bytes(bytes));
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Length word followed by the data, zero padded to a word boundary.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded_len = bytes.len().div_ceil(WORD_SIZE) * WORD_SIZE;
    let mut encoded = Vec::with_capacity(WORD_SIZE + padded_len);
    encoded.extend_from_slice(&U256::from(bytes.len()).to_big_endian());
    encoded.extend_from_slice(bytes);
    encoded.resize(WORD_SIZE + padded_len, 0);
    encoded
}

/// Splits off the data of a length-prefixed byte string. Returns `None` if
/// the declared length runs past the end of `data`.
pub fn decode_length_prefixed(data: &[u8]) -> Option<&[u8]> {
    let length_word = data.get(..WORD_SIZE)?;
    let length = usize::try_from(U256::from_big_endian(length_word)).ok()?;
    let end = WORD_SIZE.checked_add(length)?;
    data.get(WORD_SIZE..end)
}

/// Concatenates 32-byte words, the format of the list getters.
pub fn encode_words(words: impl IntoIterator<Item = U256>) -> Bytes {
    let mut out = Vec::new();
    for word in words {
        out.extend_from_slice(&word.to_big_endian());
    }
    Bytes::from(out)
}

/// Reads ABI-encoded arguments after the selector has been removed.
#[derive(Debug, Clone, Copy)]
pub struct CalldataReader<'a> {
    args: &'a [u8],
}

impl<'a> CalldataReader<'a> {
    /// Splits `calldata` into its selector and argument reader.
    pub fn split(calldata: &'a [u8]) -> Result<([u8; 4], Self), VMError> {
        let (selector, args) = calldata
            .split_first_chunk::<4>()
            .ok_or_else(|| VMError::revert("calldata shorter than a selector"))?;
        Ok((*selector, Self { args }))
    }

    pub fn new(args: &'a [u8]) -> Self {
        Self { args }
    }

    pub fn word(&self, index: usize) -> Result<U256, VMError> {
        let start = index
            .checked_mul(WORD_SIZE)
            .ok_or_else(|| VMError::revert("argument index out of range"))?;
        let word = start
            .checked_add(WORD_SIZE)
            .and_then(|end| self.args.get(start..end))
            .ok_or_else(|| VMError::revert(format!("missing argument {index}")))?;
        Ok(U256::from_big_endian(word))
    }

    pub fn h256(&self, index: usize) -> Result<H256, VMError> {
        Ok(H256(self.word(index)?.to_big_endian()))
    }

    pub fn address(&self, index: usize) -> Result<Address, VMError> {
        let word = self.word(index)?;
        if word.bits() > 160 {
            return Err(VMError::revert(format!("argument {index} is not an address")));
        }
        Ok(word_to_address(word))
    }

    pub fn bool(&self, index: usize) -> Result<bool, VMError> {
        match self.word(index)? {
            word if word.is_zero() => Ok(false),
            word if word == U256::one() => Ok(true),
            _ => Err(VMError::revert(format!("argument {index} is not a bool"))),
        }
    }

    /// Raw tail of a dynamic argument: its length word and everything after.
    pub fn tail(&self, index: usize) -> Result<&'a [u8], VMError> {
        let offset = self.word(index)?;
        usize::try_from(offset)
            .ok()
            .and_then(|offset| self.args.get(offset..))
            .ok_or_else(|| VMError::revert(format!("offset of argument {index} out of range")))
    }

    pub fn bytes(&self, index: usize) -> Result<&'a [u8], VMError> {
        decode_length_prefixed(self.tail(index)?)
            .ok_or_else(|| VMError::revert(format!("argument {index} is not a byte string")))
    }
}

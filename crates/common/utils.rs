use alloy_rlp::{Encodable, Header};
use ethereum_types::{Address, H256, U256};
use sha3::{Digest, Keccak256};

pub const ZERO_U256: U256 = U256([0, 0, 0, 0]);

pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data.as_ref()).into())
}

/// Address of a contract deployed by `sender` with sequence number `nonce`:
/// the low 20 bytes of `keccak(rlp([sender, nonce]))`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let sender_bytes: [u8; 20] = sender.0;
    let payload_length = sender_bytes.length() + nonce.length();
    let mut encoded = Vec::with_capacity(payload_length + 1);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut encoded);
    sender_bytes.encode(&mut encoded);
    nonce.encode(&mut encoded);

    Address::from_slice(&keccak(encoded).as_bytes()[12..])
}

#[inline(always)]
pub fn u256_to_h256(value: U256) -> H256 {
    H256(value.to_big_endian())
}

#[inline(always)]
pub fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// Interprets the low 20 bytes of a word as an address.
pub fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_big_endian()[12..])
}

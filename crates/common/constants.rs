use ethereum_types::{H160, H256};
use hex_literal::hex;

// === Well-known addresses ===

/// Caller used by the environment itself when it issues calls on its own behalf.
/// Always authorized for owner-only operations.
pub const SYSTEM_ADDRESS: H160 = H160(hex!("fffffffffffffffffffffffffffffffffffffffe"));

/// Callee meaning "deploy a new contract".
pub const CREATE_ADDRESS: H160 = H160([0; 20]);

pub const ARB_SYS_ADDRESS: H160 = H160(hex!("0000000000000000000000000000000000000064"));
pub const ARB_ADDRESS_TABLE_ADDRESS: H160 = H160(hex!("0000000000000000000000000000000000000066"));
pub const ARB_OWNER_ADDRESS: H160 = H160(hex!("000000000000000000000000000000000000006b"));
pub const ARB_GAS_INFO_ADDRESS: H160 = H160(hex!("000000000000000000000000000000000000006c"));

// === Hashes ===

/// keccak256 of the empty byte string.
pub const EMPTY_CODE_HASH: H256 = H256(hex!(
    "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
));

// === Chain init defaults ===

/// Challenge grace period, in milliseconds of L1 time.
pub const DEFAULT_GRACE_PERIOD_TICKS: u64 = 3 * 60 * 60 * 1000;
pub const DEFAULT_SPEED_LIMIT_PER_TICK: u64 = 100_000_000 / 1000;
pub const DEFAULT_MAX_EXECUTION_STEPS: u64 = 10_000_000_000;
pub const DEFAULT_BASE_STAKE_WEI: u64 = 1000;

pub const DEFAULT_TX_GAS_LIMIT: u64 = 8_000_000;
pub const DEFAULT_GAS_POOL_MAX: u64 = 6_000_000 * 60 * 10;
pub const DEFAULT_SPEED_LIMIT_PER_SECOND: u64 = 100_000;

// L1 gas estimates used by the default fee schedule.
pub const DEFAULT_L1_GAS_PER_L2_TX: u64 = 3700;
pub const DEFAULT_L1_GAS_PER_L1_CALLDATA_BYTE: u64 = 16;
pub const DEFAULT_L1_GAS_PER_STORAGE: u64 = 2000;
pub const DEFAULT_ARBGAS_DIVISOR: u64 = 10_000;

/// Storage charge, in ArbGas, per byte of freshly deployed contract code.
pub const STORAGE_GAS_PER_CODE_BYTE: u64 = 200;

/// Size of an ABI word.
pub const WORD_SIZE: usize = 32;

/// Network-wide constants
///
/// The genesis values below make the genesis block hash reproducible
/// bit-for-bit across independent implementations. Changing any of them
/// forks the network.
use crate::core::AssetId;

/// Native fee/settlement asset: 32 bytes of 0xff.
pub const NATIVE_ASSET_ID: AssetId = AssetId::new([0xff; 32]);

pub const BLOCK_VERSION: u64 = 1;
pub const TX_VERSION: u64 = 1;

pub const GENESIS_HEIGHT: u64 = 0;
pub const GENESIS_NONCE: u64 = 4216085;
pub const GENESIS_TIMESTAMP: u64 = 1516788453;
pub const GENESIS_BITS: u64 = 2305843009222082559;

/// Initial supply minted by the genesis coinbase
pub const GENESIS_SUPPLY: u64 = 140_700_041_250_000_000;

pub const GENESIS_COINBASE_DATA: &[u8] =
    b"Information is power. -- Jan/11/2013. Computing is power. -- Apr/24/2018.";

/// Control program receiving the genesis supply
pub const GENESIS_CONTROL_PROGRAM_HEX: &str = "00148c9d063ff74ee6d9ffa88d83aeb038068366c4c4";

/// Program opcodes referenced by the core
pub mod opcodes {
    /// Unconditionally fails; an output locked by `[OP_FAIL]` is unspendable.
    pub const OP_FAIL: u8 = 0x6a;
}

/// True if `program` can never be satisfied.
pub fn is_unspendable(program: &[u8]) -> bool {
    program.first() == Some(&opcodes::OP_FAIL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_asset_is_all_ones() {
        assert!(NATIVE_ASSET_ID.as_bytes().iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_op_fail_program_is_unspendable() {
        assert!(is_unspendable(&[opcodes::OP_FAIL]));
        assert!(!is_unspendable(&[0x00, 0x14]));
        assert!(!is_unspendable(&[]));
    }
}

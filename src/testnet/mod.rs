//! Test harness
//!
//! A software keystore and ready-made fixtures (chain, UTXO, transaction,
//! signing, blocks) for driving the ledger in tests and local tooling.

pub mod keystore;
pub mod test_utils;

pub use keystore::{KeyInfo, PseudoHsm};
pub use test_utils::*;

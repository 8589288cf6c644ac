//! # Ledger Commit
//!
//! The commitment core of a UTXO ledger: how transactions are built and
//! signed, how blocks commit to their transactions, and how a chain accepts
//! blocks one height at a time.
//!
//! ## Layout
//! - `core/`: hashing, merkle commitments, transactions, blocks and the chain state machine
//! - `txbuilder/`: template construction and signature collection
//! - `account/`: account-owned UTXOs and their conversion into builder inputs
//! - `storage/`: the `Store` trait, its sled backend and the transaction pool
//! - `testnet/`: a software keystore and end-to-end fixtures
//! - `config/`: global settings and genesis parameters
//! - `utils/`: hashing, signatures and serialization helpers
//! - `cli/`: command-line arguments for the `ledger-commit` binary
//!
//! ## Flow
//! inputs and outputs → [`Builder`] → unsigned [`Template`] → [`sign`] →
//! [`Transaction`] → [`Block`] → [`Chain::connect_block`].

pub mod account;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod testnet;
pub mod txbuilder;
pub mod utils;

pub use account::{utxo_to_inputs, Account, AccountSigner, CtrlProgram, Utxo};
pub use cli::{Command, Opt};
pub use config::{Config, FileConfig, GenesisParams, GLOBAL_CONFIG};
pub use core::{
    tx_merkle_root, tx_status_merkle_root, AssetId, Block, BlockCommitment, BlockHeader, Chain,
    ChainStatus, Hash, MerkleProof, MerkleTree, Transaction, TransactionStatus, TxInput,
    TxOutput,
};
pub use error::{BlockchainError, Result};
pub use storage::{ChainTip, SledStore, Store, TxPool};
pub use txbuilder::{
    sign, sign_progress, Builder, KeyId, SignContext, SigningInstruction, Template, XPub,
};
pub use utils::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, sha256_digest,
};

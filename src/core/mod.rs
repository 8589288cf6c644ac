//! Core ledger functionality
//!
//! This module contains the fundamental ledger components: content hashing,
//! merkle commitments, transactions, blocks and the forward-only chain state.

pub mod block;
pub mod blockchain;
pub mod consensus;
pub mod hash;
pub mod merkle;
pub mod status;
pub mod transaction;

pub use block::{Block, BlockCommitment, BlockHeader};
pub use blockchain::{Chain, ChainIterator, ChainStatus};
pub use hash::{entry_id, AssetId, EntryWriter, Hash, HASH_LEN};
pub use merkle::{tx_merkle_root, tx_status_merkle_root, MerkleProof, MerkleTree, ProofElement};
pub use status::TransactionStatus;
pub use transaction::{compute_output_id, SpendInput, Transaction, TxInput, TxOutput};

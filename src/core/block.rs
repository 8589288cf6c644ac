use crate::config::GenesisParams;
use crate::core::consensus::{BLOCK_VERSION, GENESIS_HEIGHT};
use crate::core::{
    entry_id, tx_merkle_root, EntryWriter, Hash, MerkleProof, MerkleTree, Transaction,
    TransactionStatus,
};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use log::debug;
use serde::{Deserialize, Serialize};

/// Digests binding a header to its body.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct BlockCommitment {
    pub transactions_merkle_root: Hash,
    pub transaction_status_hash: Hash,
}

impl BlockCommitment {
    pub fn compute(transactions: &[Transaction], status: &TransactionStatus) -> BlockCommitment {
        let tx_ids: Vec<Hash> = transactions.iter().map(|tx| tx.compute_id()).collect();
        BlockCommitment {
            transactions_merkle_root: tx_merkle_root(&tx_ids),
            transaction_status_hash: status.merkle_root(),
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct BlockHeader {
    pub version: u64,
    pub height: u64,
    pub previous_block_hash: Hash,
    pub timestamp: u64,
    pub nonce: u64,
    /// Difficulty target, opaque to this crate
    pub bits: u64,
    pub commitment: BlockCommitment,
}

impl BlockHeader {
    /// Header skeleton with an empty commitment; `Block::new` fills it in.
    pub fn new(
        version: u64,
        height: u64,
        previous_block_hash: Hash,
        timestamp: u64,
        nonce: u64,
        bits: u64,
    ) -> BlockHeader {
        BlockHeader {
            version,
            height,
            previous_block_hash,
            timestamp,
            nonce,
            bits,
            commitment: BlockCommitment::default(),
        }
    }

    pub fn hash(&self) -> Hash {
        let mut writer = EntryWriter::new();
        writer
            .write_u64(self.version)
            .write_u64(self.height)
            .write_hash(&self.previous_block_hash)
            .write_u64(self.timestamp)
            .write_u64(self.nonce)
            .write_u64(self.bits)
            .write_hash(&self.commitment.transactions_merkle_root)
            .write_hash(&self.commitment.transaction_status_hash);
        entry_id("blockheader", &writer.finish())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    header: BlockHeader,
    transactions: Vec<Transaction>,
    transaction_status: TransactionStatus,
}

impl Block {
    /// Assemble a block from a header skeleton, computing both commitment roots.
    pub fn new(
        mut header: BlockHeader,
        transactions: Vec<Transaction>,
        transaction_status: TransactionStatus,
    ) -> Result<Block> {
        if transaction_status.len() != transactions.len() {
            return Err(BlockchainError::Validation(format!(
                "Block has {} transactions but {} status entries",
                transactions.len(),
                transaction_status.len()
            )));
        }
        header.commitment = BlockCommitment::compute(&transactions, &transaction_status);
        let block = Block {
            header,
            transactions,
            transaction_status,
        };
        debug!(
            "Assembled block at height {} with {} transactions",
            block.header.height,
            block.transactions.len()
        );
        Ok(block)
    }

    /// Take a block as received, commitment untouched. Use
    /// `verify_commitment` before trusting it.
    pub fn from_parts(
        header: BlockHeader,
        transactions: Vec<Transaction>,
        transaction_status: TransactionStatus,
    ) -> Block {
        Block {
            header,
            transactions,
            transaction_status,
        }
    }

    pub fn generate_genesis_block(params: &GenesisParams) -> Result<Block> {
        let coinbase_tx = Transaction::new_genesis_coinbase(params)?;
        let mut status = TransactionStatus::new();
        status.set_status(0, false)?;

        let header = BlockHeader::new(
            BLOCK_VERSION,
            GENESIS_HEIGHT,
            Hash::default(),
            params.timestamp,
            params.nonce,
            params.bits,
        );
        Block::new(header, vec![coinbase_tx], status)
    }

    /// Check the header commitment against freshly recomputed roots.
    pub fn verify_commitment(&self) -> Result<()> {
        if self.transaction_status.len() != self.transactions.len() {
            return Err(BlockchainError::Validation(format!(
                "Block {} has {} transactions but {} status entries",
                self.hash(),
                self.transactions.len(),
                self.transaction_status.len()
            )));
        }
        let expected = BlockCommitment::compute(&self.transactions, &self.transaction_status);
        if expected.transactions_merkle_root != self.header.commitment.transactions_merkle_root {
            return Err(BlockchainError::Validation(format!(
                "Transactions merkle root mismatch: header {}, computed {}",
                self.header.commitment.transactions_merkle_root, expected.transactions_merkle_root
            )));
        }
        if expected.transaction_status_hash != self.header.commitment.transaction_status_hash {
            return Err(BlockchainError::Validation(format!(
                "Transaction status hash mismatch: header {}, computed {}",
                self.header.commitment.transaction_status_hash, expected.transaction_status_hash
            )));
        }
        Ok(())
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn get_header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn get_height(&self) -> u64 {
        self.header.height
    }

    pub fn get_previous_block_hash(&self) -> &Hash {
        &self.header.previous_block_hash
    }

    pub fn get_commitment(&self) -> &BlockCommitment {
        &self.header.commitment
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_transaction_status(&self) -> &TransactionStatus {
        &self.transaction_status
    }

    pub fn tx_ids(&self) -> Vec<Hash> {
        self.transactions.iter().map(|tx| tx.compute_id()).collect()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    /// Inclusion proof of the transaction at `index` against the header's
    /// transactions merkle root.
    pub fn generate_merkle_proof(&self, index: usize) -> Result<MerkleProof> {
        let tx_ids = self.tx_ids();
        let tx_id = tx_ids.get(index).copied().ok_or_else(|| {
            BlockchainError::Validation(format!(
                "Transaction index {index} out of bounds ({} transactions)",
                tx_ids.len()
            ))
        })?;
        MerkleTree::from_leaves(&tx_ids).generate_proof(tx_id.as_ref(), index)
    }

    pub fn verify_merkle_proof(&self, proof: &MerkleProof) -> bool {
        proof.merkle_root == self.header.commitment.transactions_merkle_root
            && MerkleTree::verify_proof(proof)
    }
}

// Block persistence. The chain only needs block bytes by hash, a height index
// for the connected chain and the current tip; `Store` captures exactly that
// and `SledStore` backs it with an embedded sled database.

use crate::config::GLOBAL_CONFIG;
use crate::core::{Block, Hash};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::{Path, PathBuf};

const BLOCKS_TREE: &str = "blocks";
const CHAIN_TREE: &str = "chain";
const TIP_KEY: &[u8] = b"tip";
const HEIGHT_PREFIX: u8 = b'h';

/// Hash and height of the last connected block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct ChainTip {
    pub height: u64,
    pub hash: Hash,
}

/// Durability interface consumed by `Chain`.
pub trait Store: Send + Sync {
    /// Persist block bytes by hash. Saving an identical block again is a no-op.
    fn save_block(&self, block: &Block) -> Result<()>;

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>>;

    fn block_exists(&self, hash: &Hash) -> Result<bool>;

    /// Hash of the connected block at `height`, if any.
    fn get_block_hash_at(&self, height: u64) -> Result<Option<Hash>>;

    /// Record `tip` as the new chain tip together with its height index entry.
    /// Either both writes land or neither does.
    fn save_chain_tip(&self, tip: &ChainTip) -> Result<()>;

    fn load_chain_tip(&self) -> Result<Option<ChainTip>>;
}

fn height_key(height: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = HEIGHT_PREFIX;
    key[1..].copy_from_slice(&height.to_be_bytes());
    key
}

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    db_path: Option<PathBuf>,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SledStore> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)
            .map_err(|e| BlockchainError::Persistence(format!("Failed to open database: {e}")))?;
        info!("Opened block store at {}", path.display());
        Ok(SledStore {
            db,
            db_path: Some(path),
        })
    }

    /// Open the store at the configured database path.
    pub fn open_default() -> Result<SledStore> {
        Self::open(GLOBAL_CONFIG.get_db_path())
    }

    /// In-memory store discarded on drop.
    pub fn temporary() -> Result<SledStore> {
        let db = sled::Config::new().temporary(true).open().map_err(|e| {
            BlockchainError::Persistence(format!("Failed to open temporary database: {e}"))
        })?;
        Ok(SledStore { db, db_path: None })
    }

    pub fn get_db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| BlockchainError::Persistence(format!("Failed to flush database: {e}")))?;
        Ok(())
    }

    fn blocks_tree(&self) -> Result<Tree> {
        self.db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Persistence(format!("Failed to open blocks tree: {e}")))
    }

    fn chain_tree(&self) -> Result<Tree> {
        self.db
            .open_tree(CHAIN_TREE)
            .map_err(|e| BlockchainError::Persistence(format!("Failed to open chain tree: {e}")))
    }
}

impl Store for SledStore {
    fn save_block(&self, block: &Block) -> Result<()> {
        let blocks_tree = self.blocks_tree()?;
        let block_hash = block.hash();
        let block_data = block.serialize()?;

        if let Some(existing) = blocks_tree
            .get(block_hash.as_bytes())
            .map_err(|e| BlockchainError::Persistence(format!("Failed to read block: {e}")))?
        {
            if existing.as_ref() == block_data.as_slice() {
                debug!("Block {block_hash} already saved");
                return Ok(());
            }
            return Err(BlockchainError::Validation(format!(
                "Block {block_hash} already saved with a different body"
            )));
        }

        blocks_tree
            .insert(block_hash.as_bytes(), block_data)
            .map_err(|e| BlockchainError::Persistence(format!("Failed to save block: {e}")))?;
        debug!("Saved block {block_hash} at height {}", block.get_height());
        Ok(())
    }

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        let blocks_tree = self.blocks_tree()?;
        match blocks_tree
            .get(hash.as_bytes())
            .map_err(|e| BlockchainError::Persistence(format!("Failed to get block: {e}")))?
        {
            Some(bytes) => Ok(Some(Block::deserialize(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    fn block_exists(&self, hash: &Hash) -> Result<bool> {
        let blocks_tree = self.blocks_tree()?;
        let exists = blocks_tree.contains_key(hash.as_bytes()).map_err(|e| {
            BlockchainError::Persistence(format!("Failed to check block existence: {e}"))
        })?;
        Ok(exists)
    }

    fn get_block_hash_at(&self, height: u64) -> Result<Option<Hash>> {
        let chain_tree = self.chain_tree()?;
        match chain_tree
            .get(height_key(height))
            .map_err(|e| BlockchainError::Persistence(format!("Failed to read height index: {e}")))?
        {
            Some(bytes) => Ok(Some(Hash::from_slice(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    fn save_chain_tip(&self, tip: &ChainTip) -> Result<()> {
        let chain_tree = self.chain_tree()?;
        let tip_data = serialize(tip)?;
        let key = height_key(tip.height);

        chain_tree
            .transaction(|tx_db| {
                tx_db.insert(&key[..], tip.hash.as_bytes().as_slice())?;
                tx_db.insert(TIP_KEY, tip_data.as_slice())?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError| {
                BlockchainError::Persistence(format!("Failed to update chain tip: {e}"))
            })?;
        Ok(())
    }

    fn load_chain_tip(&self) -> Result<Option<ChainTip>> {
        let chain_tree = self.chain_tree()?;
        match chain_tree
            .get(TIP_KEY)
            .map_err(|e| BlockchainError::Persistence(format!("Failed to get chain tip: {e}")))?
        {
            Some(bytes) => Ok(Some(deserialize(bytes.as_ref())?)),
            None => Ok(None),
        }
    }
}

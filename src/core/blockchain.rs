// The chain state machine: Empty -> genesis connected -> height N connected.
// It only ever moves forward. Fork choice and reorganization belong to a
// separate collaborator and never mutate this state.
//
// The tip and the transaction pool share one RwLock, so connecting a block
// (persist tip, advance tip, prune pool) is observed as a single step.

use crate::core::{Block, Hash, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::{ChainTip, Store, TxPool};
use log::{debug, info, warn};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    /// No genesis connected yet; the chain is not usable.
    Empty,
    Connected(ChainTip),
}

struct ChainState {
    tip: Option<ChainTip>,
    tx_pool: TxPool,
}

pub struct Chain<S: Store> {
    store: S,
    state: RwLock<ChainState>,
}

impl<S: Store> Chain<S> {
    /// Open a chain over `store`, restoring the tip if one was persisted.
    pub fn new(store: S, tx_pool: TxPool) -> Result<Chain<S>> {
        let tip = store.load_chain_tip()?;
        match &tip {
            Some(tip) => info!("Restored chain tip {} at height {}", tip.hash, tip.height),
            None => info!("Opened empty chain"),
        }
        Ok(Chain {
            store,
            state: RwLock::new(ChainState { tip, tx_pool }),
        })
    }

    /// Open a chain and make sure `genesis` is saved and connected. The
    /// chain is returned only if both steps succeed.
    pub fn bootstrap(store: S, tx_pool: TxPool, genesis: &Block) -> Result<Chain<S>> {
        if genesis.get_height() != 0 {
            return Err(BlockchainError::Validation(format!(
                "Genesis block must have height 0, got {}",
                genesis.get_height()
            )));
        }
        let chain = Chain::new(store, tx_pool)?;
        chain.save_block(genesis)?;
        chain.connect_block(genesis)?;
        Ok(chain)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ChainState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ChainState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist a block independent of chain linkage.
    pub fn save_block(&self, block: &Block) -> Result<()> {
        self.store.save_block(block)
    }

    /// Validate `block` against the current tip and make it the new tip.
    ///
    /// On any error the tip and the pool are left exactly as they were.
    /// Connecting the block that is already connected at its height is a
    /// no-op, which makes repeated genesis bootstrap harmless.
    pub fn connect_block(&self, block: &Block) -> Result<()> {
        block.verify_commitment()?;

        let block_hash = block.hash();
        let height = block.get_height();
        let mut state = self.write_state();

        match state.tip {
            None => {
                if height != 0 {
                    return Err(BlockchainError::Validation(format!(
                        "Chain has no genesis; cannot connect block at height {height}"
                    )));
                }
                if !block.get_previous_block_hash().is_zero() {
                    return Err(BlockchainError::Validation(
                        "Genesis block must not reference a predecessor".to_string(),
                    ));
                }
            }
            Some(tip) => {
                if height <= tip.height {
                    if self.store.get_block_hash_at(height)? == Some(block_hash) {
                        debug!("Block {block_hash} already connected at height {height}");
                        return Ok(());
                    }
                    let reason = if height == 0 {
                        "duplicate genesis".to_string()
                    } else {
                        format!("height {height} is not above tip height {}", tip.height)
                    };
                    return Err(BlockchainError::Validation(format!(
                        "Cannot connect block {block_hash}: {reason}"
                    )));
                }
                if height != tip.height + 1 {
                    return Err(BlockchainError::Validation(format!(
                        "Out-of-order block {block_hash}: height {height}, expected {}",
                        tip.height + 1
                    )));
                }
                if *block.get_previous_block_hash() != tip.hash {
                    return Err(BlockchainError::Validation(format!(
                        "Block {block_hash} does not extend tip {}",
                        tip.hash
                    )));
                }
            }
        }

        let new_tip = ChainTip {
            height,
            hash: block_hash,
        };
        if let Err(e) = self.store.save_chain_tip(&new_tip) {
            warn!("Failed to persist tip {block_hash}: {e}");
            return Err(e);
        }

        state.tip = Some(new_tip);
        let mut pruned = 0;
        for tx in block.get_transactions() {
            if state.tx_pool.remove(&tx.compute_id()).is_some() {
                pruned += 1;
            }
        }
        info!("Connected block {block_hash} at height {height} ({pruned} pooled transactions confirmed)");
        Ok(())
    }

    pub fn status(&self) -> ChainStatus {
        match self.read_state().tip {
            Some(tip) => ChainStatus::Connected(tip),
            None => ChainStatus::Empty,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.read_state().tip.is_some()
    }

    pub fn best_height(&self) -> Option<u64> {
        self.read_state().tip.map(|tip| tip.height)
    }

    pub fn best_block_hash(&self) -> Option<Hash> {
        self.read_state().tip.map(|tip| tip.hash)
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        self.store.get_block(hash)
    }

    /// Connected block at `height`.
    pub fn get_block_by_height(&self, height: u64) -> Result<Option<Block>> {
        match self.store.get_block_hash_at(height)? {
            Some(hash) => self.store.get_block(&hash),
            None => Ok(None),
        }
    }

    pub fn get_store(&self) -> &S {
        &self.store
    }

    /// Admit an unconfirmed transaction. Returns false if already pooled.
    pub fn add_to_pool(&self, tx: Transaction) -> bool {
        self.write_state().tx_pool.add(tx)
    }

    pub fn pool_contains(&self, tx_id: &Hash) -> bool {
        self.read_state().tx_pool.contains(tx_id)
    }

    pub fn pool_len(&self) -> usize {
        self.read_state().tx_pool.len()
    }

    pub fn pool_transactions(&self) -> Vec<Transaction> {
        self.read_state().tx_pool.transactions()
    }

    /// Tip and pooled transaction IDs read under one lock.
    pub fn snapshot(&self) -> (Option<ChainTip>, Vec<Hash>) {
        let state = self.read_state();
        (state.tip, state.tx_pool.tx_ids())
    }

    /// Walk connected blocks from the tip down to genesis.
    pub fn iterator(&self) -> ChainIterator<'_, S> {
        ChainIterator {
            store: &self.store,
            next_height: self.best_height(),
        }
    }
}

pub struct ChainIterator<'a, S: Store> {
    store: &'a S,
    next_height: Option<u64>,
}

impl<S: Store> ChainIterator<'_, S> {
    fn read_at(&self, height: u64) -> Result<Option<Block>> {
        let hash = match self.store.get_block_hash_at(height)? {
            Some(hash) => hash,
            None => return Ok(None),
        };
        match self.store.get_block(&hash)? {
            Some(block) => Ok(Some(block)),
            None => Err(BlockchainError::Persistence(format!(
                "Block {hash} indexed at height {height} is missing"
            ))),
        }
    }
}

/// Yields blocks from the tip down. A read failure is yielded once and ends
/// the walk.
impl<S: Store> Iterator for ChainIterator<'_, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let height = self.next_height?;
        match self.read_at(height) {
            Ok(Some(block)) => {
                self.next_height = height.checked_sub(1);
                Some(Ok(block))
            }
            Ok(None) => {
                self.next_height = None;
                None
            }
            Err(e) => {
                warn!("Stopping chain walk at height {height}: {e}");
                self.next_height = None;
                Some(Err(e))
            }
        }
    }
}

use crate::core::{Hash, Transaction};
use log::debug;
use std::collections::HashMap;

/// Admitted-but-unconfirmed transactions, keyed by transaction ID.
///
/// The pool holds no lock of its own: once handed to a `Chain` it lives
/// under the chain's state lock, so pruning on block connection and tip
/// advancement are observed together.
#[derive(Debug, Default, Clone)]
pub struct TxPool {
    inner: HashMap<Hash, Transaction>,
}

impl TxPool {
    pub fn new() -> TxPool {
        TxPool {
            inner: HashMap::new(),
        }
    }

    /// Returns false if a transaction with the same ID is already pooled.
    pub fn add(&mut self, tx: Transaction) -> bool {
        let tx_id = tx.compute_id();
        if self.inner.contains_key(&tx_id) {
            return false;
        }
        debug!("Pooled transaction {tx_id}");
        self.inner.insert(tx_id, tx);
        true
    }

    pub fn get(&self, tx_id: &Hash) -> Option<&Transaction> {
        self.inner.get(tx_id)
    }

    pub fn contains(&self, tx_id: &Hash) -> bool {
        self.inner.contains_key(tx_id)
    }

    pub fn remove(&mut self, tx_id: &Hash) -> Option<Transaction> {
        self.inner.remove(tx_id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn tx_ids(&self) -> Vec<Hash> {
        self.inner.keys().copied().collect()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.inner.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

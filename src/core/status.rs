use crate::core::{tx_status_merkle_root, Hash};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Per-transaction "failed" flags of a block, addressed by transaction position.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TransactionStatus {
    verify_status: Vec<bool>,
}

impl TransactionStatus {
    pub fn new() -> TransactionStatus {
        TransactionStatus {
            verify_status: Vec::new(),
        }
    }

    pub fn from_flags(flags: Vec<bool>) -> TransactionStatus {
        TransactionStatus {
            verify_status: flags,
        }
    }

    /// Set the flag at `index`. Positions may only be filled in order: `index`
    /// must be an existing position or the next free one.
    pub fn set_status(&mut self, index: usize, failed: bool) -> Result<()> {
        match index.cmp(&self.verify_status.len()) {
            std::cmp::Ordering::Less => {
                self.verify_status[index] = failed;
                Ok(())
            }
            std::cmp::Ordering::Equal => {
                self.verify_status.push(failed);
                Ok(())
            }
            std::cmp::Ordering::Greater => Err(BlockchainError::Validation(format!(
                "Status index {index} skips positions (have {})",
                self.verify_status.len()
            ))),
        }
    }

    pub fn get_status(&self, index: usize) -> Result<bool> {
        self.verify_status.get(index).copied().ok_or_else(|| {
            BlockchainError::Validation(format!("No status entry at index {index}"))
        })
    }

    pub fn flags(&self) -> &[bool] {
        self.verify_status.as_slice()
    }

    pub fn len(&self) -> usize {
        self.verify_status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verify_status.is_empty()
    }

    pub fn merkle_root(&self) -> Hash {
        tx_status_merkle_root(&self.verify_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_status_in_order() {
        let mut status = TransactionStatus::new();
        status.set_status(0, false).unwrap();
        status.set_status(1, true).unwrap();
        status.set_status(0, true).unwrap();
        assert_eq!(status.flags(), &[true, true]);
        assert!(status.get_status(1).unwrap());
        assert!(status.get_status(2).is_err());
    }

    #[test]
    fn test_set_status_rejects_gaps() {
        let mut status = TransactionStatus::new();
        assert!(status.set_status(1, false).is_err());
        assert!(status.is_empty());
    }
}

use crate::core::Hash;
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

const LEAF_PREFIX: u8 = 0x00;
const INTERIOR_PREFIX: u8 = 0x01;

/// Merkle tree over an ordered leaf sequence.
///
/// Leaves and interior nodes are hashed under different prefixes and a level
/// of `n > 1` leaves splits at the largest power of two below `n`. No leaf is
/// ever duplicated to fill a level, so appending a copy of the last leaf
/// produces a different root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    leaf_hashes: Vec<Hash>,
    root: Hash,
}

/// Inclusion proof for one leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Raw leaf bytes being proven
    pub leaf: Vec<u8>,
    pub merkle_root: Hash,
    /// Sibling hashes from the leaf level up to the root
    pub proof_path: Vec<ProofElement>,
    pub leaf_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    pub hash: Hash,
    /// true if the sibling sits to the right of the running hash
    pub is_right: bool,
}

impl MerkleTree {
    /// Root of the empty sequence: SHA-256 of the empty string.
    pub fn empty_root() -> Hash {
        Hash::sha256(b"")
    }

    pub fn from_leaves<T: AsRef<[u8]>>(leaves: &[T]) -> MerkleTree {
        let leaf_hashes: Vec<Hash> = leaves.iter().map(|l| Self::hash_leaf(l.as_ref())).collect();
        let root = if leaf_hashes.is_empty() {
            Self::empty_root()
        } else {
            Self::subtree_root(&leaf_hashes)
        };
        MerkleTree { leaf_hashes, root }
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_hashes.is_empty()
    }

    pub fn generate_proof(&self, leaf: &[u8], leaf_index: usize) -> Result<MerkleProof> {
        if leaf_index >= self.leaf_hashes.len() {
            return Err(BlockchainError::Validation(format!(
                "Leaf index {} out of bounds (leaf count: {})",
                leaf_index,
                self.leaf_hashes.len()
            )));
        }
        if Self::hash_leaf(leaf) != self.leaf_hashes[leaf_index] {
            return Err(BlockchainError::Validation(format!(
                "Leaf bytes do not match leaf {leaf_index}"
            )));
        }

        let mut proof_path = Vec::new();
        Self::build_proof_path(&self.leaf_hashes, leaf_index, &mut proof_path);

        Ok(MerkleProof {
            leaf: leaf.to_vec(),
            merkle_root: self.root,
            proof_path,
            leaf_index,
        })
    }

    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let mut current = Self::hash_leaf(&proof.leaf);
        for element in &proof.proof_path {
            current = if element.is_right {
                Self::hash_interior(&current, &element.hash)
            } else {
                Self::hash_interior(&element.hash, &current)
            };
        }
        current == proof.merkle_root
    }

    fn build_proof_path(hashes: &[Hash], index: usize, path: &mut Vec<ProofElement>) {
        if hashes.len() <= 1 {
            return;
        }
        let split = Self::split_point(hashes.len());
        if index < split {
            Self::build_proof_path(&hashes[..split], index, path);
            path.push(ProofElement {
                hash: Self::subtree_root(&hashes[split..]),
                is_right: true,
            });
        } else {
            Self::build_proof_path(&hashes[split..], index - split, path);
            path.push(ProofElement {
                hash: Self::subtree_root(&hashes[..split]),
                is_right: false,
            });
        }
    }

    // Callers guarantee `hashes` is non-empty.
    fn subtree_root(hashes: &[Hash]) -> Hash {
        if hashes.len() == 1 {
            return hashes[0];
        }
        let split = Self::split_point(hashes.len());
        let left = Self::subtree_root(&hashes[..split]);
        let right = Self::subtree_root(&hashes[split..]);
        Self::hash_interior(&left, &right)
    }

    /// Largest power of two strictly less than `n` (n > 1).
    fn split_point(n: usize) -> usize {
        let mut k = 1;
        while k * 2 < n {
            k *= 2;
        }
        k
    }

    fn hash_leaf(leaf: &[u8]) -> Hash {
        let mut data = Vec::with_capacity(leaf.len() + 1);
        data.push(LEAF_PREFIX);
        data.extend_from_slice(leaf);
        Hash::sha256(&data)
    }

    fn hash_interior(left: &Hash, right: &Hash) -> Hash {
        let mut data = Vec::with_capacity(65);
        data.push(INTERIOR_PREFIX);
        data.extend_from_slice(left.as_bytes());
        data.extend_from_slice(right.as_bytes());
        Hash::sha256(&data)
    }
}

/// Commitment over transaction IDs in block order.
pub fn tx_merkle_root(tx_ids: &[Hash]) -> Hash {
    MerkleTree::from_leaves(tx_ids).root()
}

/// Commitment over per-transaction failure flags, one byte per leaf.
pub fn tx_status_merkle_root(statuses: &[bool]) -> Hash {
    let leaves: Vec<[u8; 1]> = statuses.iter().map(|failed| [u8::from(*failed)]).collect();
    MerkleTree::from_leaves(&leaves).root()
}

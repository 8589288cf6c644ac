//! Fixed-size identifiers and the canonical entry hashing used for every ID
//! in the chain (outputs, transactions, block headers).

use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HASH_LEN: usize = 32;

/// 256-bit digest. Equal iff every byte matches.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_LEN]) -> Hash {
        Hash(bytes)
    }

    /// Build a hash from four 64-bit words, each written big-endian.
    /// `Hash::from_words([1, 0, 0, 0])` is the fixture-style `{V0: 1}` value.
    pub fn from_words(words: [u64; 4]) -> Hash {
        let mut bytes = [0u8; HASH_LEN];
        for (i, word) in words.iter().enumerate() {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&word.to_be_bytes());
        }
        Hash(bytes)
    }

    pub fn words(&self) -> [u64; 4] {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&self.0[i * 8..(i + 1) * 8]);
            *word = u64::from_be_bytes(chunk);
        }
        words
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Hash> {
        let array: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            BlockchainError::Serialization(format!(
                "Hash must be {HASH_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Hash(array))
    }

    pub fn from_hex(hex: &str) -> Result<Hash> {
        let bytes = HEXLOWER
            .decode(hex.as_bytes())
            .map_err(|e| BlockchainError::Serialization(format!("Invalid hash hex: {e}")))?;
        Hash::from_slice(&bytes)
    }

    /// SHA-256 of `data`.
    pub fn sha256(data: &[u8]) -> Hash {
        let digest = sha256_digest(data);
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&digest);
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Opaque identifier of a fungible asset class.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct AssetId([u8; HASH_LEN]);

impl AssetId {
    pub const fn new(bytes: [u8; HASH_LEN]) -> AssetId {
        AssetId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.to_hex())
    }
}

/// Canonical byte writer for hashed entry bodies: little-endian u64
/// integers, u64-length-prefixed byte strings and raw 32-byte digests.
#[derive(Debug, Default)]
pub struct EntryWriter {
    buf: Vec<u8>,
}

impl EntryWriter {
    pub fn new() -> EntryWriter {
        EntryWriter { buf: Vec::new() }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_u64(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_hash(&mut self, hash: &Hash) -> &mut Self {
        self.buf.extend_from_slice(hash.as_bytes());
        self
    }

    pub fn write_asset(&mut self, asset_id: &AssetId) -> &mut Self {
        self.buf.extend_from_slice(asset_id.as_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// `sha256("entryid:" || kind || ":" || sha256(body))`
pub fn entry_id(kind: &str, body: &[u8]) -> Hash {
    let body_hash = sha256_digest(body);
    let mut preimage = Vec::with_capacity(9 + kind.len() + HASH_LEN);
    preimage.extend_from_slice(b"entryid:");
    preimage.extend_from_slice(kind.as_bytes());
    preimage.push(b':');
    preimage.extend_from_slice(&body_hash);
    Hash::sha256(&preimage)
}

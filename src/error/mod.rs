//! Error handling for the commitment core
//!
//! Construction and validation errors describe caller or data-integrity bugs
//! and are always returned unchanged. Signing errors leave a template in a
//! partially-signed state that a later signing pass can pick up. Persistence
//! errors never count as acceptance.

use std::fmt;

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Malformed builder inputs or outputs
    Construction(String),
    /// Inputs of one asset do not cover the outputs of that asset
    InsufficientFunds {
        asset: String,
        required: u64,
        available: u64,
    },
    /// Signer callback failure, cancellation or incomplete signatures
    Signing(String),
    /// Block-level invariant violation (commitment, height, linkage)
    Validation(String),
    /// Storage I/O failure
    Persistence(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl BlockchainError {
    /// Whether this error belongs to the construction class (including
    /// insufficient funds).
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            BlockchainError::Construction(_) | BlockchainError::InsufficientFunds { .. }
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Construction(msg) => write!(f, "Construction error: {msg}"),
            BlockchainError::InsufficientFunds {
                asset,
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds for asset {asset}: required {required}, available {available}"
                )
            }
            BlockchainError::Signing(msg) => write!(f, "Signing error: {msg}"),
            BlockchainError::Validation(msg) => write!(f, "Validation error: {msg}"),
            BlockchainError::Persistence(msg) => write!(f, "Persistence error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Persistence(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

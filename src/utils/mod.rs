//! Utility functions and helpers
//!
//! Hashing, signatures and timestamps come from `crypto`; the persisted
//! byte format comes from `serialization`.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, public_key_from_pkcs8, sha256_digest,
};

pub use serialization::{deserialize, serialize};

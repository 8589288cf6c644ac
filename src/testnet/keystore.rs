//! Password-protected software keystore for tests and local tooling.
//!
//! Each key is a P-256 ECDSA key pair whose PKCS#8 encoding is sealed with
//! AES-256-GCM under a key stretched from the password with Argon2id. The
//! public key doubles as the key's [`XPub`]. Keys are not hierarchical: the
//! derivation path is accepted for interface compatibility and the root key
//! always signs.

use crate::error::{BlockchainError, Result};
use crate::txbuilder::XPub;
use crate::utils::{ecdsa_p256_sha256_sign_digest, new_key_pair, public_key_from_pkcs8};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use log::{debug, info};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

// Kept small so test suites stay fast.
const ARGON2_MEMORY_KIB: u32 = 4096;
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_LANES: u32 = 1;

/// Symmetric key wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecureKey {
    key: Vec<u8>,
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKey")
            .field("length", &self.key.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct SealedKey {
    alias: String,
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    salt: Vec<u8>,
}

/// Summary of a stored key, safe to hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub alias: String,
    pub xpub: XPub,
}

#[derive(Debug, Default)]
pub struct PseudoHsm {
    keys: RwLock<HashMap<XPub, SealedKey>>,
}

impl PseudoHsm {
    pub fn new() -> PseudoHsm {
        PseudoHsm::default()
    }

    /// Generate a key pair and seal it under `password`.
    pub fn create_key(&self, alias: &str, password: &str) -> Result<XPub> {
        let pkcs8 = Zeroizing::new(new_key_pair()?);
        let xpub = XPub::new(public_key_from_pkcs8(&pkcs8)?);

        let mut salt = vec![0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let mut nonce = vec![0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let cipher = cipher_for(password, &salt)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), pkcs8.as_slice())
            .map_err(|e| BlockchainError::Crypto(format!("Failed to seal key: {e}")))?;

        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        if keys.values().any(|k| k.alias == alias) {
            return Err(BlockchainError::Crypto(format!(
                "Key alias {alias} already exists"
            )));
        }
        keys.insert(
            xpub.clone(),
            SealedKey {
                alias: alias.to_string(),
                ciphertext,
                nonce,
                salt,
            },
        );
        info!("Created key {alias} ({xpub})");
        Ok(xpub)
    }

    /// Sign `msg` with the key behind `xpub`.
    pub fn xsign(
        &self,
        xpub: &XPub,
        path: &[Vec<u8>],
        msg: &[u8],
        password: &str,
    ) -> Result<Vec<u8>> {
        let sealed = self
            .keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(xpub)
            .cloned()
            .ok_or_else(|| BlockchainError::Crypto(format!("Unknown key {xpub}")))?;

        let cipher = cipher_for(password, &sealed.salt)?;
        let pkcs8 = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
                .map_err(|_| {
                    BlockchainError::Crypto(format!("Invalid password for key {}", sealed.alias))
                })?,
        );

        debug!(
            "Signing with key {} (path depth {})",
            sealed.alias,
            path.len()
        );
        ecdsa_p256_sha256_sign_digest(&pkcs8, msg)
    }

    pub fn has_key(&self, xpub: &XPub) -> bool {
        self.keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(xpub)
    }

    pub fn list_keys(&self) -> Vec<KeyInfo> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        let mut infos: Vec<KeyInfo> = keys
            .iter()
            .map(|(xpub, sealed)| KeyInfo {
                alias: sealed.alias.clone(),
                xpub: xpub.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.alias.cmp(&b.alias));
        infos
    }
}

fn derive_key(password: &str, salt: &[u8]) -> Result<SecureKey> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_LANES,
        Some(KEY_LEN),
    )
    .map_err(|e| BlockchainError::Crypto(format!("Invalid Argon2 parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = vec![0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| BlockchainError::Crypto(format!("Key derivation failed: {e}")))?;
    Ok(SecureKey { key })
}

fn cipher_for(password: &str, salt: &[u8]) -> Result<Aes256Gcm> {
    let key = derive_key(password, salt)?;
    Aes256Gcm::new_from_slice(&key.key)
        .map_err(|e| BlockchainError::Crypto(format!("Invalid AES-256-GCM key: {e}")))
}

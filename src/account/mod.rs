//! Account-side view of spendable outputs.
//!
//! An account owns a set of signing keys and a quorum. Each control program it
//! hands out is tied to a key index, and a [`Utxo`] remembers which account
//! and key index can unlock it, which is all [`utxo_to_inputs`] needs to turn
//! it into a builder input.

use crate::core::{AssetId, EntryWriter, Hash, TxInput};
use crate::error::{BlockchainError, Result};
use crate::txbuilder::{KeyId, SigningInstruction, XPub};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Witness version byte followed by a 32-byte push.
const PROGRAM_PREFIX: [u8; 2] = [0x00, 0x20];

/// A spendable output owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub output_id: Hash,
    pub source_id: Hash,
    pub asset_id: AssetId,
    pub amount: u64,
    pub source_pos: u64,
    pub control_program: Vec<u8>,
    pub account_id: String,
    pub address: String,
    pub control_program_index: u64,
}

/// A control program issued by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CtrlProgram {
    pub account_id: String,
    pub address: String,
    pub key_index: u64,
    pub control_program: Vec<u8>,
}

/// Keys and quorum guarding an account's outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSigner {
    pub xpubs: Vec<XPub>,
    pub quorum: usize,
    /// Position of the account among the keystore's accounts
    pub key_index: u64,
}

impl AccountSigner {
    pub fn new(xpubs: Vec<XPub>, quorum: usize, key_index: u64) -> Result<AccountSigner> {
        if xpubs.is_empty() {
            return Err(BlockchainError::Construction(
                "Account signer needs at least one key".to_string(),
            ));
        }
        if quorum == 0 || quorum > xpubs.len() {
            return Err(BlockchainError::Construction(format!(
                "Quorum {quorum} is invalid for {} keys",
                xpubs.len()
            )));
        }
        Ok(AccountSigner {
            xpubs,
            quorum,
            key_index,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub alias: String,
    pub signer: AccountSigner,
}

impl Account {
    pub fn new(alias: &str, signer: AccountSigner) -> Account {
        Account {
            id: Uuid::new_v4().to_string(),
            alias: alias.to_string(),
            signer,
        }
    }

    /// Control program locking funds to this account's keys at `key_index`.
    pub fn create_ctrl_program(&self, key_index: u64) -> CtrlProgram {
        let mut writer = EntryWriter::new();
        writer
            .write_u64(self.signer.quorum as u64)
            .write_u64(self.signer.key_index)
            .write_u64(key_index)
            .write_u64(self.signer.xpubs.len() as u64);
        for xpub in &self.signer.xpubs {
            writer.write_bytes(xpub.as_bytes());
        }
        let script_hash = sha256_digest(&writer.finish());

        let mut control_program = PROGRAM_PREFIX.to_vec();
        control_program.extend_from_slice(&script_hash);
        CtrlProgram {
            account_id: self.id.clone(),
            address: HEXLOWER.encode(&script_hash),
            key_index,
            control_program,
        }
    }
}

/// Derivation path for the key at `key_index` of the account at `account_index`.
pub fn derivation_path(account_index: u64, key_index: u64) -> Vec<Vec<u8>> {
    vec![
        account_index.to_le_bytes().to_vec(),
        key_index.to_le_bytes().to_vec(),
    ]
}

/// Spend input for `utxo` together with the signing instruction that
/// unlocks it.
pub fn utxo_to_inputs(
    signer: &AccountSigner,
    utxo: &Utxo,
) -> Result<(TxInput, SigningInstruction)> {
    if utxo.output_id.is_zero() {
        return Err(BlockchainError::Construction(
            "UTXO has a zero output ID".to_string(),
        ));
    }
    if signer.xpubs.is_empty() {
        return Err(BlockchainError::Construction(format!(
            "Account {} has no signing keys",
            utxo.account_id
        )));
    }

    let input = TxInput::new_spend(
        utxo.source_id,
        utxo.source_pos,
        utxo.asset_id,
        utxo.amount,
        utxo.control_program.clone(),
    );

    let path = derivation_path(signer.key_index, utxo.control_program_index);
    let mut keys: Vec<KeyId> = signer
        .xpubs
        .iter()
        .map(|xpub| KeyId::new(xpub.clone(), path.clone()))
        .collect();

    let instruction = if keys.len() == 1 && signer.quorum <= 1 {
        SigningInstruction::single_key(keys.remove(0))
    } else {
        SigningInstruction::multi_key(signer.quorum, keys)
    };
    Ok((input, instruction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::NATIVE_ASSET_ID;

    fn signer(keys: u8, quorum: usize) -> AccountSigner {
        let xpubs = (1..=keys).map(|k| XPub::new(vec![k; 8])).collect();
        AccountSigner::new(xpubs, quorum, 3).unwrap()
    }

    fn utxo(program: &CtrlProgram) -> Utxo {
        Utxo {
            output_id: Hash::from_words([1, 0, 0, 0]),
            source_id: Hash::from_words([2, 0, 0, 0]),
            asset_id: NATIVE_ASSET_ID,
            amount: 1_000,
            source_pos: 0,
            control_program: program.control_program.clone(),
            account_id: program.account_id.clone(),
            address: program.address.clone(),
            control_program_index: program.key_index,
        }
    }

    #[test]
    fn test_single_key_account_gives_single_key_instruction() {
        let account = Account::new("alice", signer(1, 1));
        let program = account.create_ctrl_program(5);
        let (input, instruction) = utxo_to_inputs(&account.signer, &utxo(&program)).unwrap();

        assert_eq!(input.asset_amount(), Some((NATIVE_ASSET_ID, 1_000)));
        assert_eq!(input.control_program(), program.control_program.as_slice());
        match instruction {
            SigningInstruction::SingleKey { key, signature } => {
                assert!(signature.is_none());
                assert_eq!(key.derivation_path, derivation_path(3, 5));
                assert_eq!(key.derivation_path[1], 5u64.to_le_bytes().to_vec());
            }
            other => panic!("unexpected instruction {other:?}"),
        }
    }

    #[test]
    fn test_multisig_account_gives_quorum_instruction() {
        let account = Account::new("treasury", signer(3, 2));
        let program = account.create_ctrl_program(1);
        let (_, instruction) = utxo_to_inputs(&account.signer, &utxo(&program)).unwrap();
        match instruction {
            SigningInstruction::MultiKey {
                threshold,
                keys,
                signatures,
            } => {
                assert_eq!(threshold, 2);
                assert_eq!(keys.len(), 3);
                assert_eq!(signatures, vec![None, None, None]);
            }
            other => panic!("unexpected instruction {other:?}"),
        }
    }

    #[test]
    fn test_zero_output_id_rejected() {
        let account = Account::new("alice", signer(1, 1));
        let mut bad = utxo(&account.create_ctrl_program(0));
        bad.output_id = Hash::default();
        assert!(matches!(
            utxo_to_inputs(&account.signer, &bad),
            Err(BlockchainError::Construction(_))
        ));
    }

    #[test]
    fn test_ctrl_programs_differ_by_index() {
        let account = Account::new("alice", signer(1, 1));
        let a = account.create_ctrl_program(0);
        let b = account.create_ctrl_program(1);
        assert_ne!(a.control_program, b.control_program);
        assert_eq!(a.control_program.len(), 34);
        assert_eq!(a.account_id, account.id);
    }

    #[test]
    fn test_invalid_quorum_rejected() {
        assert!(AccountSigner::new(vec![], 1, 0).is_err());
        assert!(AccountSigner::new(vec![XPub::new(vec![1])], 2, 0).is_err());
        assert!(AccountSigner::new(vec![XPub::new(vec![1])], 0, 0).is_err());
    }
}

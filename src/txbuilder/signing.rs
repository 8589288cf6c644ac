//! Signing coordination for templates.
//!
//! Signing is a separate step from building because key material may live
//! behind a keystore, a hardware device or a remote party. The coordinator
//! only walks the template's signing instructions and asks an external signer
//! for each missing signature; it never sees private keys.
//!
//! The message handed to the signer is always the transaction ID, which does
//! not cover witness arguments, so every party signs the same digest no
//! matter how many signatures are already attached.

use crate::core::TxInput;
use crate::error::{BlockchainError, Result};
use crate::txbuilder::Template;
use data_encoding::HEXLOWER;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Public half of a signing key, as handed out by a keystore.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XPub(Vec<u8>);

impl XPub {
    pub fn new(bytes: Vec<u8>) -> XPub {
        XPub(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.0)
    }
}

impl fmt::Display for XPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for XPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XPub({})", self.to_hex())
    }
}

/// A key expected to sign, with the derivation path the keystore should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyId {
    pub xpub: XPub,
    pub derivation_path: Vec<Vec<u8>>,
}

impl KeyId {
    pub fn new(xpub: XPub, derivation_path: Vec<Vec<u8>>) -> KeyId {
        KeyId {
            xpub,
            derivation_path,
        }
    }
}

/// Which keys must sign one input, and how many of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningInstruction {
    SingleKey {
        key: KeyId,
        signature: Option<Vec<u8>>,
    },
    /// `signatures` has one slot per key, in key order.
    MultiKey {
        threshold: usize,
        keys: Vec<KeyId>,
        signatures: Vec<Option<Vec<u8>>>,
    },
}

impl SigningInstruction {
    pub fn single_key(key: KeyId) -> SigningInstruction {
        SigningInstruction::SingleKey {
            key,
            signature: None,
        }
    }

    pub fn multi_key(threshold: usize, keys: Vec<KeyId>) -> SigningInstruction {
        let signatures = vec![None; keys.len()];
        SigningInstruction::MultiKey {
            threshold,
            keys,
            signatures,
        }
    }

    /// Instruction for an input that carries no witness, such as a coinbase.
    /// For coinbase inputs, which carry no witness.
    pub fn no_signature() -> SigningInstruction {
        SigningInstruction::MultiKey {
            threshold: 0,
            keys: vec![],
            signatures: vec![],
        }
    }

    pub fn key_count(&self) -> usize {
        match self {
            SigningInstruction::SingleKey { .. } => 1,
            SigningInstruction::MultiKey { keys, .. } => keys.len(),
        }
    }

    /// Check that this instruction can be satisfied by signatures for
    /// `input`. Coinbase inputs take no keys; spends need a reachable
    /// quorum of at least one.
    pub fn validate_for(&self, input_index: usize, input: &TxInput) -> Result<()> {
        if input.is_coinbase() {
            if self.key_count() != 0 {
                return Err(BlockchainError::Construction(format!(
                    "Coinbase input {input_index} cannot carry signing keys"
                )));
            }
            return Ok(());
        }
        match self {
            SigningInstruction::SingleKey { .. } => Ok(()),
            SigningInstruction::MultiKey {
                threshold,
                keys,
                signatures,
            } => {
                if keys.is_empty() {
                    return Err(BlockchainError::Construction(format!(
                        "Spend input {input_index} has no signing keys"
                    )));
                }
                if *threshold == 0 || *threshold > keys.len() {
                    return Err(BlockchainError::Construction(format!(
                        "Input {input_index} quorum {threshold} is invalid for {} keys",
                        keys.len()
                    )));
                }
                if signatures.len() != keys.len() {
                    return Err(BlockchainError::Construction(format!(
                        "Input {input_index} has {} signature slots for {} keys",
                        signatures.len(),
                        keys.len()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Quorum reached.
    pub fn is_complete(&self) -> bool {
        match self {
            SigningInstruction::SingleKey { signature, .. } => signature.is_some(),
            SigningInstruction::MultiKey {
                threshold,
                signatures,
                ..
            } => signatures.iter().filter(|s| s.is_some()).count() >= *threshold,
        }
    }

    pub fn signature_count(&self) -> usize {
        match self {
            SigningInstruction::SingleKey { signature, .. } => usize::from(signature.is_some()),
            SigningInstruction::MultiKey { signatures, .. } => {
                signatures.iter().filter(|s| s.is_some()).count()
            }
        }
    }

    /// Signatures in slot order, empty slots skipped.
    pub fn witness_arguments(&self) -> Vec<Vec<u8>> {
        match self {
            SigningInstruction::SingleKey { signature, .. } => signature.iter().cloned().collect(),
            SigningInstruction::MultiKey { signatures, .. } => {
                signatures.iter().flatten().cloned().collect()
            }
        }
    }

    /// Empty slots the signer should be asked to fill.
    fn pending_slots(&self) -> Vec<(usize, KeyId)> {
        match self {
            SigningInstruction::SingleKey { key, signature } => match signature {
                Some(_) => vec![],
                None => vec![(0, key.clone())],
            },
            SigningInstruction::MultiKey {
                keys, signatures, ..
            } => keys
                .iter()
                .zip(signatures.iter())
                .enumerate()
                .filter(|(_, (_, sig))| sig.is_none())
                .map(|(slot, (key, _))| (slot, key.clone()))
                .collect(),
        }
    }

    fn fill_slot(&mut self, slot: usize, sig: Vec<u8>) -> Result<()> {
        match self {
            SigningInstruction::SingleKey { signature, .. } if slot == 0 => {
                *signature = Some(sig);
                Ok(())
            }
            SigningInstruction::MultiKey { signatures, .. } if slot < signatures.len() => {
                signatures[slot] = Some(sig);
                Ok(())
            }
            _ => Err(BlockchainError::Signing(format!(
                "Signature slot {slot} does not exist"
            ))),
        }
    }
}

/// Cancellation flag and optional deadline for one signing pass.
#[derive(Debug, Clone, Default)]
pub struct SignContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SignContext {
    pub fn new() -> SignContext {
        SignContext::default()
    }

    pub fn with_timeout(timeout: Duration) -> SignContext {
        SignContext {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(BlockchainError::Signing("Signing cancelled".to_string()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(BlockchainError::Signing(
                    "Signing deadline exceeded".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Fill every missing signature the signer can provide.
///
/// `signer` is called as `(ctx, xpub, derivation_path, digest, password)` and
/// returns the signature bytes. Inputs whose quorum is already met are left
/// alone. With `xpub_filter` set, only the listed keys are asked.
///
/// The first signer error aborts the pass. Signatures collected before it
/// stay on the template so a later pass can finish the job.
pub fn sign<F>(
    ctx: &SignContext,
    template: &mut Template,
    xpub_filter: Option<&[XPub]>,
    password: &str,
    signer: F,
) -> Result<()>
where
    F: Fn(&SignContext, &XPub, &[Vec<u8>], &[u8; 32], &str) -> Result<Vec<u8>>,
{
    let digest = *template.transaction.id().as_bytes();
    let mut signed = 0usize;

    for input_index in 0..template.signing_instructions.len() {
        let instruction = &template.signing_instructions[input_index];
        if instruction.is_complete() {
            continue;
        }

        for (slot, key) in instruction.pending_slots() {
            if template.signing_instructions[input_index].is_complete() {
                break;
            }
            if let Some(filter) = xpub_filter {
                if !filter.contains(&key.xpub) {
                    continue;
                }
            }

            ctx.check()?;
            let signature = match signer(ctx, &key.xpub, &key.derivation_path, &digest, password) {
                Ok(signature) => signature,
                Err(e) => {
                    warn!("Signer failed for input {input_index} with key {}: {e}", key.xpub);
                    return Err(match e {
                        BlockchainError::Signing(_) => e,
                        other => BlockchainError::Signing(format!(
                            "Signer failed for input {input_index}: {other}"
                        )),
                    });
                }
            };

            template.signing_instructions[input_index].fill_slot(slot, signature)?;
            signed += 1;
            debug!("Signed input {input_index} slot {slot} with key {}", key.xpub);
        }
    }

    info!(
        "Signing pass over transaction {} added {signed} signatures",
        template.transaction.id()
    );
    Ok(())
}

/// True iff every input has reached its quorum.
pub fn sign_progress(template: &Template) -> bool {
    template
        .signing_instructions
        .iter()
        .all(SigningInstruction::is_complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::{NATIVE_ASSET_ID, TX_VERSION};
    use crate::core::{Hash, TxInput, TxOutput};
    use crate::txbuilder::Builder;
    use std::cell::RefCell;

    fn xpub(tag: u8) -> XPub {
        XPub::new(vec![tag; 4])
    }

    fn key(tag: u8) -> KeyId {
        KeyId::new(xpub(tag), vec![vec![tag]])
    }

    fn spend() -> TxInput {
        TxInput::new_spend(Hash::from_words([2, 0, 0, 0]), 0, NATIVE_ASSET_ID, 500, vec![0x51])
    }

    fn template(instructions: Vec<SigningInstruction>) -> Template {
        let mut builder = Builder::new(0);
        for instruction in instructions {
            builder.add_input(spend(), instruction);
        }
        builder.add_output(TxOutput::new(NATIVE_ASSET_ID, 100, vec![0x6a]));
        builder.build().unwrap()
    }

    fn echo_signer(
        _: &SignContext,
        xpub: &XPub,
        _: &[Vec<u8>],
        _: &[u8; 32],
        _: &str,
    ) -> Result<Vec<u8>> {
        Ok(xpub.as_bytes().to_vec())
    }

    #[test]
    fn test_single_key_sign_completes() {
        let mut tpl = template(vec![SigningInstruction::single_key(key(1))]);
        assert!(!sign_progress(&tpl));
        sign(&SignContext::new(), &mut tpl, None, "pw", echo_signer).unwrap();
        assert!(sign_progress(&tpl));
        assert_eq!(tpl.signing_instructions[0].witness_arguments(), vec![vec![1u8; 4]]);
    }

    #[test]
    fn test_signer_receives_tx_id_path_and_password() {
        let mut tpl = template(vec![SigningInstruction::single_key(key(7))]);
        let expected = *tpl.transaction.id().as_bytes();
        let seen = RefCell::new(None);
        sign(&SignContext::new(), &mut tpl, None, "secret", |_, _, path, digest, pw| {
            *seen.borrow_mut() = Some((path.to_vec(), *digest, pw.to_string()));
            Ok(vec![0xaa])
        })
        .unwrap();
        let (path, digest, pw) = seen.into_inner().unwrap();
        assert_eq!(path, vec![vec![7u8]]);
        assert_eq!(digest, expected);
        assert_eq!(pw, "secret");
    }

    #[test]
    fn test_two_of_three_progress() {
        let keys = vec![key(1), key(2), key(3)];
        let mut tpl = template(vec![SigningInstruction::multi_key(2, keys)]);

        let only_first = [xpub(1)];
        sign(&SignContext::new(), &mut tpl, Some(&only_first[..]), "pw", echo_signer).unwrap();
        assert!(!sign_progress(&tpl));
        assert_eq!(tpl.signing_instructions[0].signature_count(), 1);

        let only_third = [xpub(3)];
        sign(&SignContext::new(), &mut tpl, Some(&only_third[..]), "pw", echo_signer).unwrap();
        assert!(sign_progress(&tpl));
        assert_eq!(
            tpl.signing_instructions[0].witness_arguments(),
            vec![vec![1u8; 4], vec![3u8; 4]]
        );
    }

    #[test]
    fn test_quorum_met_stops_asking() {
        let keys = vec![key(1), key(2), key(3)];
        let mut tpl = template(vec![SigningInstruction::multi_key(2, keys)]);
        let calls = RefCell::new(0);
        sign(&SignContext::new(), &mut tpl, None, "pw", |ctx, x, p, d, pw| {
            *calls.borrow_mut() += 1;
            echo_signer(ctx, x, p, d, pw)
        })
        .unwrap();
        assert_eq!(*calls.borrow(), 2);
        assert!(sign_progress(&tpl));

        sign(&SignContext::new(), &mut tpl, None, "pw", |_, _, _, _, _| {
            panic!("complete inputs must not be signed again")
        })
        .unwrap();
    }

    #[test]
    fn test_signer_error_keeps_earlier_signatures() {
        let mut tpl = template(vec![
            SigningInstruction::single_key(key(1)),
            SigningInstruction::single_key(key(2)),
        ]);
        let result = sign(&SignContext::new(), &mut tpl, None, "pw", |ctx, x, p, d, pw| {
            if x == &xpub(2) {
                return Err(BlockchainError::Crypto("wrong password".to_string()));
            }
            echo_signer(ctx, x, p, d, pw)
        });
        assert!(matches!(result, Err(BlockchainError::Signing(_))));
        assert!(tpl.signing_instructions[0].is_complete());
        assert!(!tpl.signing_instructions[1].is_complete());
        assert!(!sign_progress(&tpl));

        sign(&SignContext::new(), &mut tpl, None, "pw", echo_signer).unwrap();
        assert!(sign_progress(&tpl));
    }

    #[test]
    fn test_cancelled_context_leaves_slots_empty() {
        let mut tpl = template(vec![SigningInstruction::single_key(key(1))]);
        let ctx = SignContext::new();
        ctx.cancel();
        assert!(matches!(
            sign(&ctx, &mut tpl, None, "pw", echo_signer),
            Err(BlockchainError::Signing(_))
        ));
        assert_eq!(tpl.signing_instructions[0].signature_count(), 0);
    }

    #[test]
    fn test_expired_deadline_is_signing_error() {
        let mut tpl = template(vec![SigningInstruction::single_key(key(1))]);
        let ctx = SignContext::with_timeout(Duration::ZERO);
        assert!(matches!(
            sign(&ctx, &mut tpl, None, "pw", echo_signer),
            Err(BlockchainError::Signing(_))
        ));
        assert!(!sign_progress(&tpl));
    }

    #[test]
    fn test_signing_keeps_transaction_id() {
        let mut tpl = template(vec![SigningInstruction::single_key(key(1))]);
        let id = tpl.transaction.id();
        sign(&SignContext::new(), &mut tpl, None, "pw", echo_signer).unwrap();
        let tx = tpl.into_transaction().unwrap();
        assert_eq!(tx.id(), id);
        assert_eq!(tx.compute_id(), id);
        assert_eq!(tx.get_inputs()[0].arguments().to_vec(), vec![vec![1u8; 4]]);
    }
}

use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::txbuilder::SigningInstruction;
use serde::{Deserialize, Serialize};

/// A transaction under construction together with what it still needs to be
/// signed. `signing_instructions[i]` belongs to input `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub transaction: Transaction,
    pub signing_instructions: Vec<SigningInstruction>,
    pub allow_additional_actions: bool,
    /// Builder construction time, milliseconds since the unix epoch
    pub timestamp: i64,
}

impl Template {
    /// Finalize a fully signed template, attaching each input's signatures
    /// as its witness arguments.
    pub fn into_transaction(self) -> Result<Transaction> {
        let mut transaction = self.transaction;
        for (index, instruction) in self.signing_instructions.iter().enumerate() {
            if !instruction.is_complete() {
                return Err(BlockchainError::Signing(format!(
                    "Input {index} of transaction {} is not fully signed",
                    transaction.id()
                )));
            }
            let arguments = instruction.witness_arguments();
            if !arguments.is_empty() {
                transaction.set_input_arguments(index, arguments)?;
            }
        }
        Ok(transaction)
    }

    /// Encode for hand-off to another signing party.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Template> {
        let template: Template = serde_json::from_str(json)?;
        if template.signing_instructions.len() != template.transaction.get_inputs().len() {
            return Err(BlockchainError::Serialization(format!(
                "Template has {} inputs but {} signing instructions",
                template.transaction.get_inputs().len(),
                template.signing_instructions.len()
            )));
        }
        if !template.transaction.verify_id() {
            return Err(BlockchainError::Serialization(
                "Template transaction ID does not match its content".to_string(),
            ));
        }
        for (index, (input, instruction)) in template
            .transaction
            .get_inputs()
            .iter()
            .zip(template.signing_instructions.iter())
            .enumerate()
        {
            instruction.validate_for(index, input)?;
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::{NATIVE_ASSET_ID, TX_VERSION};
    use crate::core::{Hash, TxInput, TxOutput};
    use crate::txbuilder::{sign, Builder, KeyId, SignContext, XPub};

    fn unsigned() -> Template {
        let mut builder = Builder::new(1_700_000_000_000);
        builder.add_input(
            TxInput::new_spend(Hash::from_words([2, 0, 0, 0]), 0, NATIVE_ASSET_ID, 10, vec![]),
            SigningInstruction::single_key(KeyId::new(XPub::new(vec![9]), vec![])),
        );
        builder.add_output(TxOutput::new(NATIVE_ASSET_ID, 10, vec![0x51]));
        builder.build().unwrap()
    }

    #[test]
    fn test_incomplete_template_cannot_finalize() {
        assert!(matches!(
            unsigned().into_transaction(),
            Err(BlockchainError::Signing(_))
        ));
    }

    #[test]
    fn test_json_handoff_between_parties() {
        let tpl = unsigned();
        let json = tpl.to_json().unwrap();
        let mut received = Template::from_json(&json).unwrap();
        assert_eq!(received, tpl);

        sign(&SignContext::new(), &mut received, None, "pw", |_, _, _, _, _| {
            Ok(vec![1, 2])
        })
        .unwrap();
        let back = Template::from_json(&received.to_json().unwrap()).unwrap();
        let tx = back.into_transaction().unwrap();
        assert_eq!(tx.id(), tpl.transaction.id());
        assert_eq!(tx.get_inputs()[0].arguments().to_vec(), vec![vec![1u8, 2]]);
    }

    #[test]
    fn test_json_with_mismatched_instructions_rejected() {
        let mut tpl = unsigned();
        tpl.signing_instructions.clear();
        let json = tpl.to_json().unwrap();
        assert!(matches!(
            Template::from_json(&json),
            Err(BlockchainError::Serialization(_))
        ));
    }

    #[test]
    fn test_json_with_unreachable_quorum_rejected() {
        let mut tpl = unsigned();
        tpl.signing_instructions[0] =
            SigningInstruction::multi_key(2, vec![KeyId::new(XPub::new(vec![9]), vec![])]);
        let json = tpl.to_json().unwrap();
        assert!(matches!(
            Template::from_json(&json),
            Err(BlockchainError::Construction(_))
        ));
    }

    #[test]
    fn test_coinbase_only_template_finalizes_without_witness() {
        let tx = Transaction::new(TX_VERSION, 0, vec![TxInput::new_coinbase(vec![1])], vec![]);
        let tpl = Template {
            transaction: tx.clone(),
            signing_instructions: vec![SigningInstruction::no_signature()],
            allow_additional_actions: false,
            timestamp: 0,
        };
        assert_eq!(tpl.into_transaction().unwrap(), tx);
    }
}

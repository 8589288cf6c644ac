//! Transaction construction.
//!
//! The [`Builder`] accumulates inputs (each paired with its signing
//! instruction) and outputs without checking anything, then `build` validates
//! the whole set at once and hands back an unsigned [`Template`]. The builder
//! never signs and never reads chain state.

use crate::core::consensus::TX_VERSION;
use crate::core::{AssetId, Transaction, TxInput, TxOutput};
use crate::error::{BlockchainError, Result};
use crate::txbuilder::{SigningInstruction, Template};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Builder {
    timestamp: i64,
    time_range: u64,
    inputs: Vec<TxInput>,
    signing_instructions: Vec<SigningInstruction>,
    outputs: Vec<TxOutput>,
    allow_additional_actions: bool,
}

impl Builder {
    /// `timestamp` is the construction time recorded on the template.
    pub fn new(timestamp: i64) -> Builder {
        Builder {
            timestamp,
            time_range: 0,
            inputs: vec![],
            signing_instructions: vec![],
            outputs: vec![],
            allow_additional_actions: false,
        }
    }

    pub fn add_input(&mut self, input: TxInput, instruction: SigningInstruction) -> &mut Self {
        self.inputs.push(input);
        self.signing_instructions.push(instruction);
        self
    }

    pub fn add_output(&mut self, output: TxOutput) -> &mut Self {
        self.outputs.push(output);
        self
    }

    /// Other parties will add inputs or outputs later, so an unbalanced
    /// asset is not an error yet.
    pub fn allow_additional_actions(&mut self) -> &mut Self {
        self.allow_additional_actions = true;
        self
    }

    pub fn set_time_range(&mut self, time_range: u64) -> &mut Self {
        self.time_range = time_range;
        self
    }

    /// Validate the accumulated actions and produce an unsigned template.
    pub fn build(&self) -> Result<Template> {
        if self.inputs.is_empty() {
            return Err(BlockchainError::Construction(
                "Transaction has no inputs".to_string(),
            ));
        }

        let mut available: BTreeMap<AssetId, u64> = BTreeMap::new();
        for (index, (input, instruction)) in self
            .inputs
            .iter()
            .zip(self.signing_instructions.iter())
            .enumerate()
        {
            instruction.validate_for(index, input)?;
            if let Some(source_id) = input.source_id() {
                if source_id.is_zero() {
                    return Err(BlockchainError::Construction(format!(
                        "Input {index} references a zero source ID"
                    )));
                }
            }
            if let Some((asset_id, amount)) = input.asset_amount() {
                add_amount(&mut available, asset_id, amount)?;
            }
        }

        let mut required: BTreeMap<AssetId, u64> = BTreeMap::new();
        for output in &self.outputs {
            add_amount(&mut required, *output.get_asset_id(), output.get_amount())?;
        }

        if !self.allow_additional_actions {
            for (asset_id, required) in &required {
                let available = available.get(asset_id).copied().unwrap_or(0);
                if available < *required {
                    return Err(BlockchainError::InsufficientFunds {
                        asset: asset_id.to_hex(),
                        required: *required,
                        available,
                    });
                }
            }
        }

        let transaction = Transaction::new(
            TX_VERSION,
            self.time_range,
            self.inputs.clone(),
            self.outputs.clone(),
        );
        debug!(
            "Built transaction {} with {} inputs and {} outputs",
            transaction.id(),
            self.inputs.len(),
            self.outputs.len()
        );

        Ok(Template {
            transaction,
            signing_instructions: self.signing_instructions.clone(),
            allow_additional_actions: self.allow_additional_actions,
            timestamp: self.timestamp,
        })
    }
}

fn add_amount(totals: &mut BTreeMap<AssetId, u64>, asset_id: AssetId, amount: u64) -> Result<()> {
    let total = totals.entry(asset_id).or_insert(0);
    *total = total.checked_add(amount).ok_or_else(|| {
        BlockchainError::Construction(format!("Amount overflow for asset {asset_id}"))
    })?;
    Ok(())
}

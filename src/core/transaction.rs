// Transactions follow the UTXO model: inputs consume earlier outputs, outputs
// create new spendable records. Every ID here is a content hash over the
// canonical entry encoding, never over the bincode bytes, and witness
// arguments are left out so that signing cannot change an ID.

use crate::config::GenesisParams;
use crate::core::consensus::TX_VERSION;
use crate::core::{entry_id, AssetId, EntryWriter, Hash};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};

const SPEND_TAG: u8 = 0x01;
const COINBASE_TAG: u8 = 0x00;

/// ID of the output at `source_position` of the entry `source_id`.
pub fn compute_output_id(
    source_id: &Hash,
    source_position: u64,
    asset_id: &AssetId,
    amount: u64,
    control_program: &[u8],
) -> Hash {
    let mut writer = EntryWriter::new();
    writer
        .write_hash(source_id)
        .write_u64(source_position)
        .write_asset(asset_id)
        .write_u64(amount)
        .write_bytes(control_program);
    entry_id("output", &writer.finish())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    asset_id: AssetId,
    amount: u64,
    control_program: Vec<u8>,
}

impl TxOutput {
    pub fn new(asset_id: AssetId, amount: u64, control_program: Vec<u8>) -> TxOutput {
        TxOutput {
            asset_id,
            amount,
            control_program,
        }
    }

    pub fn get_asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_control_program(&self) -> &[u8] {
        self.control_program.as_slice()
    }

    fn write_commitment(&self, writer: &mut EntryWriter) {
        writer
            .write_asset(&self.asset_id)
            .write_u64(self.amount)
            .write_bytes(&self.control_program);
    }
}

/// Spend of a prior output. The spent output's content is carried in full so
/// the input can be balanced and its output ID recomputed without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct SpendInput {
    source_id: Hash,
    source_position: u64,
    asset_id: AssetId,
    amount: u64,
    control_program: Vec<u8>,
    arguments: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum TxInput {
    Spend(SpendInput),
    Coinbase { arbitrary: Vec<u8> },
}

impl TxInput {
    pub fn new_spend(
        source_id: Hash,
        source_position: u64,
        asset_id: AssetId,
        amount: u64,
        control_program: Vec<u8>,
    ) -> TxInput {
        TxInput::Spend(SpendInput {
            source_id,
            source_position,
            asset_id,
            amount,
            control_program,
            arguments: vec![],
        })
    }

    pub fn new_coinbase(arbitrary: Vec<u8>) -> TxInput {
        TxInput::Coinbase { arbitrary }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, TxInput::Coinbase { .. })
    }

    /// Output ID consumed by a spend; `None` for coinbase inputs.
    pub fn spent_output_id(&self) -> Option<Hash> {
        match self {
            TxInput::Spend(spend) => Some(compute_output_id(
                &spend.source_id,
                spend.source_position,
                &spend.asset_id,
                spend.amount,
                &spend.control_program,
            )),
            TxInput::Coinbase { .. } => None,
        }
    }

    pub fn source_id(&self) -> Option<&Hash> {
        match self {
            TxInput::Spend(spend) => Some(&spend.source_id),
            TxInput::Coinbase { .. } => None,
        }
    }

    pub fn asset_amount(&self) -> Option<(AssetId, u64)> {
        match self {
            TxInput::Spend(spend) => Some((spend.asset_id, spend.amount)),
            TxInput::Coinbase { .. } => None,
        }
    }

    pub fn control_program(&self) -> &[u8] {
        match self {
            TxInput::Spend(spend) => spend.control_program.as_slice(),
            TxInput::Coinbase { .. } => &[],
        }
    }

    pub fn arguments(&self) -> &[Vec<u8>] {
        match self {
            TxInput::Spend(spend) => spend.arguments.as_slice(),
            TxInput::Coinbase { .. } => &[],
        }
    }

    fn set_arguments(&mut self, arguments: Vec<Vec<u8>>) -> Result<()> {
        match self {
            TxInput::Spend(spend) => {
                spend.arguments = arguments;
                Ok(())
            }
            TxInput::Coinbase { .. } => Err(BlockchainError::Signing(
                "Coinbase inputs carry no witness".to_string(),
            )),
        }
    }

    fn write_commitment(&self, writer: &mut EntryWriter) {
        match self {
            TxInput::Spend(_) => {
                if let Some(output_id) = self.spent_output_id() {
                    writer.write_u8(SPEND_TAG).write_hash(&output_id);
                }
            }
            TxInput::Coinbase { arbitrary } => {
                writer.write_u8(COINBASE_TAG).write_bytes(arbitrary);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Hash,
    version: u64,
    time_range: u64,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(
        version: u64,
        time_range: u64,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
    ) -> Transaction {
        let mut tx = Transaction {
            id: Hash::default(),
            version,
            time_range,
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// The coinbase transaction minting the genesis supply.
    pub fn new_genesis_coinbase(params: &GenesisParams) -> Result<Transaction> {
        let output = TxOutput::new(
            params.asset_id()?,
            params.supply,
            params.control_program_bytes()?,
        );
        let input = TxInput::new_coinbase(params.coinbase_data.as_bytes().to_vec());
        Ok(Transaction::new(TX_VERSION, 0, vec![input], vec![output]))
    }

    /// Recompute the ID from canonical content.
    pub fn compute_id(&self) -> Hash {
        let mut writer = EntryWriter::new();
        writer
            .write_u64(self.version)
            .write_u64(self.time_range)
            .write_u64(self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_commitment(&mut writer);
        }
        writer.write_u64(self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_commitment(&mut writer);
        }
        entry_id("tx", &writer.finish())
    }

    pub fn id(&self) -> Hash {
        self.id
    }

    /// False if the cached ID no longer matches the content (e.g. a
    /// tampered deserialized transaction).
    pub fn verify_id(&self) -> bool {
        self.id == self.compute_id()
    }

    pub fn get_version(&self) -> u64 {
        self.version
    }

    pub fn get_time_range(&self) -> u64 {
        self.time_range
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// ID a later spend uses to reference output `index` of this transaction.
    pub fn output_id(&self, index: usize) -> Result<Hash> {
        let output = self.outputs.get(index).ok_or_else(|| {
            BlockchainError::Construction(format!(
                "Output index {index} out of range ({} outputs)",
                self.outputs.len()
            ))
        })?;
        Ok(compute_output_id(
            &self.id,
            index as u64,
            &output.asset_id,
            output.amount,
            &output.control_program,
        ))
    }

    /// Spend input consuming output `index` of this transaction.
    pub fn spend_output(&self, index: usize) -> Result<TxInput> {
        let output = self.outputs.get(index).ok_or_else(|| {
            BlockchainError::Construction(format!("Output index {index} out of range"))
        })?;
        Ok(TxInput::new_spend(
            self.id,
            index as u64,
            output.asset_id,
            output.amount,
            output.control_program.clone(),
        ))
    }

    pub(crate) fn set_input_arguments(
        &mut self,
        index: usize,
        arguments: Vec<Vec<u8>>,
    ) -> Result<()> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            BlockchainError::Signing(format!("Input index {index} out of range"))
        })?;
        input.set_arguments(arguments)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::{opcodes::OP_FAIL, NATIVE_ASSET_ID};

    fn spend(amount: u64) -> TxInput {
        TxInput::new_spend(
            Hash::from_words([2, 0, 0, 0]),
            0,
            NATIVE_ASSET_ID,
            amount,
            vec![0x00, 0x14],
        )
    }

    #[test]
    fn test_genesis_coinbase_id_vector() {
        let tx = Transaction::new_genesis_coinbase(&GenesisParams::default()).unwrap();
        assert!(tx.is_coinbase());
        assert_eq!(
            tx.id().to_hex(),
            "eb1587a4a2bc0fdb82125c86e07a2e6e0d86bc4b6696c48698a32bfabaeee92c"
        );
    }

    #[test]
    fn test_witness_does_not_change_id() {
        let mut tx = Transaction::new(
            TX_VERSION,
            0,
            vec![spend(1_000)],
            vec![TxOutput::new(NATIVE_ASSET_ID, 100, vec![OP_FAIL])],
        );
        let id = tx.id();
        tx.set_input_arguments(0, vec![vec![1, 2, 3]]).unwrap();
        assert_eq!(tx.get_inputs()[0].arguments().to_vec(), vec![vec![1u8, 2, 3]]);
        assert_eq!(tx.compute_id(), id);
        assert!(tx.verify_id());
    }

    #[test]
    fn test_content_changes_id() {
        let outputs = vec![TxOutput::new(NATIVE_ASSET_ID, 100, vec![OP_FAIL])];
        let a = Transaction::new(TX_VERSION, 0, vec![spend(1_000)], outputs.clone());
        let b = Transaction::new(TX_VERSION, 0, vec![spend(1_001)], outputs.clone());
        let c = Transaction::new(TX_VERSION, 1, vec![spend(1_000)], outputs);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_output_id_matches_spend_of_that_output() {
        let tx = Transaction::new(
            TX_VERSION,
            0,
            vec![spend(1_000)],
            vec![
                TxOutput::new(NATIVE_ASSET_ID, 600, vec![0x51]),
                TxOutput::new(NATIVE_ASSET_ID, 400, vec![0x52]),
            ],
        );
        for index in 0..2 {
            let input = tx.spend_output(index).unwrap();
            assert_eq!(input.spent_output_id(), Some(tx.output_id(index).unwrap()));
        }
        assert_ne!(tx.output_id(0).unwrap(), tx.output_id(1).unwrap());
        assert!(tx.output_id(2).is_err());
    }

    #[test]
    fn test_coinbase_rejects_witness() {
        let mut tx = Transaction::new(TX_VERSION, 0, vec![TxInput::new_coinbase(vec![])], vec![]);
        assert!(matches!(
            tx.set_input_arguments(0, vec![vec![1]]),
            Err(BlockchainError::Signing(_))
        ));
    }

    #[test]
    fn test_serialized_roundtrip_keeps_id() {
        let tx = Transaction::new_genesis_coinbase(&GenesisParams::default()).unwrap();
        let restored = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(restored, tx);
        assert!(restored.verify_id());
    }
}

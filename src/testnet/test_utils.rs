//! Fixtures for exercising the ledger end to end
//!
//! These only go through the public builder, signer and store interfaces, so
//! they double as a reference for how the pieces fit together.

use crate::account::{utxo_to_inputs, Account, AccountSigner, CtrlProgram, Utxo};
use crate::config::GenesisParams;
use crate::core::consensus::{opcodes::OP_FAIL, BLOCK_VERSION, NATIVE_ASSET_ID};
use crate::core::{Block, BlockHeader, Chain, Hash, TransactionStatus, TxOutput};
use crate::error::Result;
use crate::storage::{Store, TxPool};
use crate::testnet::PseudoHsm;
use crate::txbuilder::{sign, sign_progress, Builder, SignContext, Template};
use crate::utils::current_timestamp;

/// Amount held by the UTXO returned from [`mock_utxo`].
pub const MOCK_UTXO_AMOUNT: u64 = 1_000_000_000;

/// Amount [`mock_tx`] sends to the unspendable program.
pub const MOCK_SPEND_AMOUNT: u64 = 100;

pub fn mock_tx_pool() -> TxPool {
    TxPool::new()
}

/// A chain over `store` with the default genesis block saved and connected.
pub fn mock_chain<S: Store>(store: S) -> Result<Chain<S>> {
    let genesis = generate_genesis_block()?;
    Chain::bootstrap(store, mock_tx_pool(), &genesis)
}

/// A synthetic native-asset UTXO locked by `ctrl_prog`.
pub fn mock_utxo(ctrl_prog: &CtrlProgram) -> Utxo {
    Utxo {
        output_id: Hash::from_words([1, 0, 0, 0]),
        source_id: Hash::from_words([2, 0, 0, 0]),
        asset_id: NATIVE_ASSET_ID,
        amount: MOCK_UTXO_AMOUNT,
        source_pos: 0,
        control_program: ctrl_prog.control_program.clone(),
        account_id: ctrl_prog.account_id.clone(),
        address: ctrl_prog.address.clone(),
        control_program_index: ctrl_prog.key_index,
    }
}

/// Unsigned template spending `utxo` into an unspendable output.
pub fn mock_tx(utxo: &Utxo, account: &Account) -> Result<Template> {
    let (input, instruction) = utxo_to_inputs(&account.signer, utxo)?;
    let mut builder = Builder::new(current_timestamp()?);
    builder
        .add_input(input, instruction)
        .add_output(TxOutput::new(NATIVE_ASSET_ID, MOCK_SPEND_AMOUNT, vec![OP_FAIL]));
    builder.build()
}

/// Sign `tpl` with every key `hsm` holds and report whether it is complete.
pub fn mock_sign(tpl: &mut Template, hsm: &PseudoHsm, password: &str) -> Result<bool> {
    sign(
        &SignContext::new(),
        tpl,
        None,
        password,
        |_, xpub, path, digest, password| hsm.xsign(xpub, path, digest, password),
    )?;
    Ok(sign_progress(tpl))
}

/// An empty block at height 1.
pub fn mock_block() -> Result<Block> {
    let header = BlockHeader::new(BLOCK_VERSION, 1, Hash::default(), 0, 0, 0);
    Block::new(header, vec![], TransactionStatus::new())
}

pub fn generate_genesis_block() -> Result<Block> {
    Block::generate_genesis_block(&GenesisParams::default())
}

/// A single-key account whose key lives in `hsm` under `password`.
pub fn mock_account(hsm: &PseudoHsm, password: &str) -> Result<Account> {
    let alias = format!("test-account-{}", hsm.list_keys().len());
    let xpub = hsm.create_key(&alias, password)?;
    let signer = AccountSigner::new(vec![xpub], 1, 1)?;
    Ok(Account::new(&alias, signer))
}

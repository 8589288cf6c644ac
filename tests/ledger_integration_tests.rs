//! Ledger integration tests
//!
//! Drives the public API end to end: account UTXO to signed transaction,
//! transaction to block commitment, block to persisted chain tip.

use ledger_commit::core::consensus::{opcodes::OP_FAIL, BLOCK_VERSION, NATIVE_ASSET_ID};
use ledger_commit::testnet::{
    generate_genesis_block, mock_account, mock_block, mock_chain, mock_sign, mock_tx, mock_utxo,
    PseudoHsm, MOCK_SPEND_AMOUNT, MOCK_UTXO_AMOUNT,
};
use ledger_commit::{
    ecdsa_p256_sha256_sign_verify, sign, sign_progress, tx_merkle_root, tx_status_merkle_root,
    Account, AccountSigner, Block, BlockHeader, BlockchainError, Builder, Chain, ChainStatus,
    ChainTip, Hash, SignContext, SledStore, Store, TransactionStatus, TxOutput, TxPool,
};
use tempfile::tempdir;

#[test]
fn test_mock_utxo_spend_signs_and_commits() {
    let hsm = PseudoHsm::new();
    let account = mock_account(&hsm, "password").unwrap();
    let utxo = mock_utxo(&account.create_ctrl_program(0));
    assert_eq!(utxo.amount, MOCK_UTXO_AMOUNT);

    let mut tpl = mock_tx(&utxo, &account).unwrap();
    let tx_id = tpl.transaction.id();
    assert_eq!(tpl.transaction.get_outputs().len(), 1);
    assert_eq!(tpl.transaction.get_outputs()[0].get_amount(), MOCK_SPEND_AMOUNT);
    assert_eq!(tpl.transaction.get_outputs()[0].get_control_program(), &[OP_FAIL]);

    assert!(mock_sign(&mut tpl, &hsm, "password").unwrap());

    let witness = tpl.signing_instructions[0].witness_arguments();
    assert!(ecdsa_p256_sha256_sign_verify(
        account.signer.xpubs[0].as_bytes(),
        &witness[0],
        tx_id.as_bytes()
    ));

    let tx = tpl.into_transaction().unwrap();
    assert_eq!(tx.id(), tx_id);

    let header = BlockHeader::new(BLOCK_VERSION, 1, Hash::default(), 0, 0, 0);
    let block = Block::new(header, vec![tx], TransactionStatus::from_flags(vec![false])).unwrap();
    assert_eq!(
        block.get_commitment().transactions_merkle_root,
        tx_merkle_root(&[tx_id])
    );
    let proof = block.generate_merkle_proof(0).unwrap();
    assert!(block.verify_merkle_proof(&proof));
}

#[test]
fn test_genesis_reproduces_fixed_commitment() {
    let genesis = generate_genesis_block().unwrap();
    let header = genesis.get_header();
    assert_eq!(header.version, 1);
    assert_eq!(header.height, 0);
    assert_eq!(header.nonce, 4216085);
    assert_eq!(header.timestamp, 1516788453);
    assert_eq!(header.bits, 2305843009222082559);
    assert!(header.previous_block_hash.is_zero());

    assert_eq!(
        genesis.get_transactions()[0].id().to_hex(),
        "eb1587a4a2bc0fdb82125c86e07a2e6e0d86bc4b6696c48698a32bfabaeee92c"
    );
    assert_eq!(
        header.commitment.transactions_merkle_root.to_hex(),
        "4033d3199bc5b5b7b71b174a4fb6f8595af2c7ab6a936e2706e7f3e369f9abe0"
    );
    assert_eq!(
        header.commitment.transaction_status_hash,
        tx_status_merkle_root(&[false])
    );
    assert_eq!(
        genesis.hash().to_hex(),
        "b49ec78469330f77446083f6405fcbd3dae185c5afc3f71d762c27e7a5ccf6f7"
    );
    assert_eq!(generate_genesis_block().unwrap(), genesis);
}

#[test]
fn test_two_of_three_account_across_keystores() {
    let alice = PseudoHsm::new();
    let bob = PseudoHsm::new();
    let carol = PseudoHsm::new();
    let xpubs = vec![
        alice.create_key("alice", "a-pass").unwrap(),
        bob.create_key("bob", "b-pass").unwrap(),
        carol.create_key("carol", "c-pass").unwrap(),
    ];
    let account = Account::new("treasury", AccountSigner::new(xpubs, 2, 0).unwrap());
    let utxo = mock_utxo(&account.create_ctrl_program(3));
    let mut tpl = mock_tx(&utxo, &account).unwrap();

    let mut sign_with = |hsm: &PseudoHsm, password: &str| {
        let filter: Vec<_> = hsm.list_keys().into_iter().map(|k| k.xpub).collect();
        sign(
            &SignContext::new(),
            &mut tpl,
            Some(filter.as_slice()),
            password,
            |_, xpub, path, digest, password| hsm.xsign(xpub, path, digest, password),
        )
        .unwrap();
        sign_progress(&tpl)
    };
    assert!(!sign_with(&alice, "a-pass"));
    assert!(sign_with(&carol, "c-pass"));

    let tx = tpl.into_transaction().unwrap();
    assert_eq!(tx.get_inputs()[0].arguments().len(), 2);
}

#[test]
fn test_unbalanced_spend_is_construction_error() {
    let hsm = PseudoHsm::new();
    let account = mock_account(&hsm, "password").unwrap();
    let utxo = mock_utxo(&account.create_ctrl_program(0));
    let (input, instruction) = ledger_commit::utxo_to_inputs(&account.signer, &utxo).unwrap();

    let mut builder = Builder::new(0);
    builder
        .add_input(input, instruction)
        .add_output(TxOutput::new(NATIVE_ASSET_ID, MOCK_UTXO_AMOUNT + 1, vec![OP_FAIL]));
    let err = builder.build().unwrap_err();
    assert!(err.is_construction());
    assert!(matches!(err, BlockchainError::InsufficientFunds { .. }));
}

#[test]
fn test_chain_rejects_bad_blocks_and_keeps_tip() {
    let chain = mock_chain(SledStore::temporary().unwrap()).unwrap();
    let genesis = generate_genesis_block().unwrap();

    // Height 1 but pointing at the zero hash instead of genesis.
    let orphan = mock_block().unwrap();
    assert!(matches!(
        chain.connect_block(&orphan),
        Err(BlockchainError::Validation(_))
    ));

    let header = BlockHeader::new(BLOCK_VERSION, 2, genesis.hash(), 1, 0, 0);
    let skipped = Block::new(header, vec![], TransactionStatus::new()).unwrap();
    assert!(matches!(
        chain.connect_block(&skipped),
        Err(BlockchainError::Validation(_))
    ));

    chain.connect_block(&genesis).unwrap();
    assert_eq!(
        chain.status(),
        ChainStatus::Connected(ChainTip {
            height: 0,
            hash: genesis.hash(),
        })
    );
}

#[test]
fn test_signed_tx_pooled_then_confirmed() {
    let hsm = PseudoHsm::new();
    let account = mock_account(&hsm, "password").unwrap();
    let chain = mock_chain(SledStore::temporary().unwrap()).unwrap();
    let genesis = generate_genesis_block().unwrap();

    let mut tpl = mock_tx(&mock_utxo(&account.create_ctrl_program(0)), &account).unwrap();
    assert!(mock_sign(&mut tpl, &hsm, "password").unwrap());
    let tx = tpl.into_transaction().unwrap();
    assert!(chain.add_to_pool(tx.clone()));
    assert!(!chain.add_to_pool(tx.clone()));

    let header = BlockHeader::new(BLOCK_VERSION, 1, genesis.hash(), 1, 0, 0);
    let block = Block::new(header, vec![tx.clone()], TransactionStatus::from_flags(vec![false]))
        .unwrap();
    chain.save_block(&block).unwrap();
    chain.connect_block(&block).unwrap();

    let (tip, pooled) = chain.snapshot();
    assert_eq!(tip.map(|t| t.hash), Some(block.hash()));
    assert!(pooled.is_empty());
    let stored = chain.get_block_by_height(1).unwrap().unwrap();
    assert_eq!(stored.get_transactions()[0].id(), tx.id());
}

#[test]
fn test_chain_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger");
    let genesis_hash = {
        let store = SledStore::open(&path).unwrap();
        let chain = mock_chain(store).unwrap();
        chain.get_store().flush().unwrap();
        chain.best_block_hash().unwrap()
    };

    let store = SledStore::open(&path).unwrap();
    assert!(store.block_exists(&genesis_hash).unwrap());
    let chain = Chain::new(store.clone(), TxPool::new()).unwrap();
    assert!(chain.is_initialized());
    assert_eq!(chain.best_height(), Some(0));
    assert_eq!(chain.best_block_hash(), Some(genesis_hash));

    // Bootstrapping an already initialized database is harmless.
    let again = Chain::bootstrap(store, TxPool::new(), &generate_genesis_block().unwrap()).unwrap();
    assert_eq!(again.best_height(), Some(0));
    assert_eq!(again.best_block_hash(), Some(genesis_hash));
}

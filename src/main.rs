use clap::Parser;
use ledger_commit::{
    Block, Chain, ChainStatus, Command, FileConfig, Opt, SledStore, TxPool, GLOBAL_CONFIG,
};
use log::{error, info, LevelFilter};
use std::process;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &opt.config {
        let file_config = FileConfig::load(path)?;
        if let Some(db_path) = file_config.db_path {
            GLOBAL_CONFIG.set_db_path(db_path);
        }
        GLOBAL_CONFIG.set_genesis_params(file_config.genesis);
        info!("Loaded configuration from {path}");
    }

    match opt.command {
        Command::Genesis => {
            let genesis = Block::generate_genesis_block(&GLOBAL_CONFIG.get_genesis_params())?;
            print_block(&genesis);
        }
        Command::Init { db } => {
            let store = open_store(db)?;
            let genesis = Block::generate_genesis_block(&GLOBAL_CONFIG.get_genesis_params())?;
            let chain = Chain::bootstrap(store, TxPool::new(), &genesis)?;
            chain.get_store().flush()?;
            println!("Chain initialized with genesis {}", genesis.hash());
        }
        Command::Tip { db } => {
            let chain = Chain::new(open_store(db)?, TxPool::new())?;
            match chain.status() {
                ChainStatus::Connected(tip) => {
                    println!("Height: {}", tip.height);
                    println!("Hash:   {}", tip.hash);
                }
                ChainStatus::Empty => println!("Chain is empty; run `init` first"),
            }
        }
        Command::Printchain { db } => {
            let chain = Chain::new(open_store(db)?, TxPool::new())?;
            for block in chain.iterator() {
                print_block(&block?);
            }
        }
    }
    Ok(())
}

fn open_store(db: Option<String>) -> ledger_commit::Result<SledStore> {
    match db {
        Some(path) => SledStore::open(path),
        None => SledStore::open_default(),
    }
}

fn print_block(block: &Block) {
    let header = block.get_header();
    println!("Block hash:    {}", block.hash());
    println!("Height:        {}", header.height);
    println!("Prev hash:     {}", header.previous_block_hash);
    println!("Timestamp:     {}", header.timestamp);
    println!("Nonce:         {}", header.nonce);
    println!("Bits:          {}", header.bits);
    println!("Tx root:       {}", header.commitment.transactions_merkle_root);
    println!("Status root:   {}", header.commitment.transaction_status_hash);
    for (tx, failed) in block
        .get_transactions()
        .iter()
        .zip(block.get_transaction_status().flags())
    {
        println!("- Transaction {} (failed: {failed})", tx.id());
        for output in tx.get_outputs() {
            println!(
                "-- Output {} of asset {}",
                output.get_amount(),
                output.get_asset_id()
            );
        }
    }
    println!();
}

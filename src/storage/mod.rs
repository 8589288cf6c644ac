//! Data storage and persistence
//!
//! Durable block storage behind the `Store` trait and the in-memory pool of
//! unconfirmed transactions.

pub mod store;
pub mod tx_pool;

pub use store::{ChainTip, SledStore, Store};
pub use tx_pool::TxPool;

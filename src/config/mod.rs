//! Configuration management
//!
//! Database location and genesis parameters, resolved from built-in
//! defaults, an optional TOML file (`CHAIN_CONFIG`) and environment
//! overrides (`CHAIN_DB_PATH`).

pub mod settings;

pub use settings::{Config, FileConfig, GenesisParams, GLOBAL_CONFIG};

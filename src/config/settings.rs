use crate::core::consensus::{
    GENESIS_BITS, GENESIS_COINBASE_DATA, GENESIS_CONTROL_PROGRAM_HEX, GENESIS_NONCE,
    GENESIS_SUPPLY, GENESIS_TIMESTAMP, NATIVE_ASSET_ID,
};
use crate::core::{AssetId, Hash};
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

const DEFAULT_DB_PATH: &str = "data";

const DB_PATH_ENV: &str = "CHAIN_DB_PATH";
const CONFIG_FILE_ENV: &str = "CHAIN_CONFIG";

/// Parameters that fully determine the genesis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisParams {
    pub nonce: u64,
    pub timestamp: u64,
    pub bits: u64,
    pub supply: u64,
    pub coinbase_data: String,
    /// Hex-encoded control program receiving the supply
    pub control_program: String,
    /// Hex-encoded asset minted by the coinbase
    pub asset_id: String,
}

impl Default for GenesisParams {
    fn default() -> Self {
        GenesisParams {
            nonce: GENESIS_NONCE,
            timestamp: GENESIS_TIMESTAMP,
            bits: GENESIS_BITS,
            supply: GENESIS_SUPPLY,
            coinbase_data: String::from_utf8_lossy(GENESIS_COINBASE_DATA).into_owned(),
            control_program: GENESIS_CONTROL_PROGRAM_HEX.to_string(),
            asset_id: NATIVE_ASSET_ID.to_hex(),
        }
    }
}

impl GenesisParams {
    pub fn control_program_bytes(&self) -> Result<Vec<u8>> {
        HEXLOWER
            .decode(self.control_program.as_bytes())
            .map_err(|e| BlockchainError::Config(format!("Invalid genesis control program: {e}")))
    }

    pub fn asset_id(&self) -> Result<AssetId> {
        let hash = Hash::from_hex(&self.asset_id)
            .map_err(|e| BlockchainError::Config(format!("Invalid genesis asset id: {e}")))?;
        Ok(AssetId::new(*hash.as_bytes()))
    }
}

/// On-disk configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub genesis: GenesisParams,
}

impl FileConfig {
    pub fn from_toml_str(contents: &str) -> Result<FileConfig> {
        toml::from_str(contents)
            .map_err(|e| BlockchainError::Config(format!("Invalid configuration file: {e}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}

struct Settings {
    db_path: PathBuf,
    genesis: GenesisParams,
}

pub struct Config {
    inner: RwLock<Settings>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Built-in defaults, then the file named by `CHAIN_CONFIG`, then
    /// `CHAIN_DB_PATH`.
    pub fn new() -> Config {
        let mut settings = Settings {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            genesis: GenesisParams::default(),
        };

        if let Ok(file) = env::var(CONFIG_FILE_ENV) {
            match FileConfig::load(&file) {
                Ok(file_config) => {
                    if let Some(db_path) = file_config.db_path {
                        settings.db_path = PathBuf::from(db_path);
                    }
                    settings.genesis = file_config.genesis;
                }
                Err(e) => log::warn!("Ignoring configuration file {file}: {e}"),
            }
        }

        if let Ok(db_path) = env::var(DB_PATH_ENV) {
            settings.db_path = PathBuf::from(db_path);
        }

        Config {
            inner: RwLock::new(settings),
        }
    }

    pub fn from_file_config(file_config: FileConfig) -> Config {
        Config {
            inner: RwLock::new(Settings {
                db_path: file_config
                    .db_path
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
                genesis: file_config.genesis,
            }),
        }
    }

    pub fn get_db_path(&self) -> PathBuf {
        self.inner
            .read()
            .map(|s| s.db_path.clone())
            .unwrap_or_else(|e| e.into_inner().db_path.clone())
    }

    pub fn set_db_path<P: Into<PathBuf>>(&self, path: P) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.db_path = path.into();
    }

    pub fn get_genesis_params(&self) -> GenesisParams {
        self.inner
            .read()
            .map(|s| s.genesis.clone())
            .unwrap_or_else(|e| e.into_inner().genesis.clone())
    }

    pub fn set_genesis_params(&self, genesis: GenesisParams) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.genesis = genesis;
    }
}

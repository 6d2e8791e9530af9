//! # Node Configuration
//!
//! One TOML document configures every subsystem. Each section is optional
//! and falls back to its defaults:
//!
//! ```toml
//! [network]
//! name = "devnet"
//! active_delegates = 51
//!
//! [genesis]
//! secret = "genesis"
//!
//! [[genesis.delegates]]
//! username = "genesis_1"
//! secret = "first delegate passphrase"
//!
//! [forger]
//! secrets = ["first delegate passphrase"]
//! ```
//!
//! The file is named by `DC_CONFIG`. Without it the node runs on defaults.

use std::path::{Path, PathBuf};

use dc_02_transaction_pool::PoolConfig;
use dc_03_blockchain::BlockchainConfig;
use dc_04_forger::ForgerConfig;
use serde::Deserialize;
use shared_types::NetworkConfig;
use thiserror::Error;

use crate::genesis::GenesisConfig;

/// Environment variable holding the configuration file path.
pub const CONFIG_ENV: &str = "DC_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub network: NetworkConfig,
    pub genesis: GenesisConfig,
    pub pool: PoolConfig,
    pub blockchain: BlockchainConfig,
    pub forger: ForgerConfig,
    pub storage: StorageConfig,
}

/// Where durable state lives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of the persistent pool. The pool stays in memory when unset.
    pub pool_dir: Option<PathBuf>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Load from the file named by `DC_CONFIG`, or defaults when it is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the subsystems cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.active_delegates == 0 {
            return Err(ConfigError::Invalid(
                "network.active_delegates must be positive".into(),
            ));
        }
        if self.network.blocktime == 0 {
            return Err(ConfigError::Invalid("network.blocktime must be positive".into()));
        }
        if self.network.max_transactions_per_block == 0 {
            return Err(ConfigError::Invalid(
                "network.max_transactions_per_block must be positive".into(),
            ));
        }
        if self.genesis.secret.is_empty() {
            return Err(ConfigError::Invalid("genesis.secret must not be empty".into()));
        }
        if self.blockchain.max_queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "blockchain.max_queue_depth must be positive".into(),
            ));
        }
        Ok(())
    }
}

//! Configuration management for coinledger

use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub chain: ChainParams,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet_path")]
    pub path: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: default_wallet_path(),
        }
    }
}

/// Consensus constants of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainParams {
    /// Difficulty of the first block.
    #[serde(default = "default_difficulty")]
    pub default_difficulty: u32,
    /// Retarget every this many blocks.
    #[serde(default = "default_difficulty_interval")]
    pub difficulty_interval: u64,
    /// Target minutes between two blocks.
    #[serde(default = "default_block_interval_minutes")]
    pub block_interval_minutes: i64,
    /// Tolerance in minutes around the expected retarget window.
    #[serde(default = "default_allowed_range")]
    pub allowed_range: i64,
    /// Amount minted by every coinbase transaction.
    #[serde(default = "default_miner_reward")]
    pub miner_reward: u64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            default_difficulty: default_difficulty(),
            difficulty_interval: default_difficulty_interval(),
            block_interval_minutes: default_block_interval_minutes(),
            allowed_range: default_allowed_range(),
            miner_reward: default_miner_reward(),
        }
    }
}

impl ChainParams {
    /// Minutes the last `difficulty_interval` blocks should have taken.
    pub fn expected_minutes(&self) -> i64 {
        self.difficulty_interval as i64 * self.block_interval_minutes
    }
}

fn default_database_path() -> String {
    "./data/coinledger.db".to_string()
}

fn default_wallet_path() -> String {
    "./data/coinledger.wallet".to_string()
}

fn default_difficulty() -> u32 {
    2
}

fn default_difficulty_interval() -> u64 {
    5
}

fn default_block_interval_minutes() -> i64 {
    2
}

fn default_allowed_range() -> i64 {
    2
}

fn default_miner_reward() -> u64 {
    50
}

/// Load `config.toml` from the working directory.
pub fn load_config() -> Result<Config> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Load a config file, falling back to defaults when it does not exist.
pub fn load_config_from<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let config: Config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)?
    } else {
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.database.path.is_empty() {
            return Err(ChainError::ConfigError(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.wallet.path.is_empty() {
            return Err(ChainError::ConfigError(
                "wallet.path must not be empty".to_string(),
            ));
        }
        if self.chain.difficulty_interval == 0 {
            return Err(ChainError::ConfigError(
                "chain.difficulty_interval must be at least 1".to_string(),
            ));
        }
        if self.chain.miner_reward == 0 {
            return Err(ChainError::ConfigError(
                "chain.miner_reward must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

//! Error types for coinledger

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Corrupt chain state: {0}")]
    Corrupt(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Bincode error: {0}")]
    BincodeError(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Wallet error: {0}")]
    WalletError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl ChainError {
    /// Errors that mean the persisted state can no longer be trusted.
    /// Callers must abort the operation instead of retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChainError::Corrupt(_)
                | ChainError::InvalidBlock(_)
                | ChainError::DatabaseError(_)
                | ChainError::BincodeError(_)
                | ChainError::IoError(_)
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::BincodeError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::WalletError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

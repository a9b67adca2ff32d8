//! coinledger - A single-node proof-of-work ledger with a UTXO transaction model
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the chain head, difficulty retargeting and chain-derived views
//! - [`transaction`] - Transaction types, coinbase minting and validation
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work mining
//!
//! ## Cryptography
//! - [`crypto`] - Signatures and verification (secp256k1)
//! - [`wallet`] - The local node key
//!
//! ## Storage
//! - [`persistence`] - Key/value store (SQLite, in-memory)
//! - [`codec`] - Byte encoding and content hashing
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod wallet;

// ============================================================================
// Storage
// ============================================================================
pub mod codec;
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, Blockchain, ChainHead};
pub use config::{ChainParams, Config};
pub use error::{ChainError, Result};
pub use transaction::{Tx, TxIn, TxOut, UTxOut};
pub use wallet::Wallet;

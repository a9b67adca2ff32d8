//! Transfers between addresses and the coinbase that mints block rewards.

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::TxIndex;

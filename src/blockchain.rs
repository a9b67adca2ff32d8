//! Blocks, the chain head and everything derived from walking the chain.

pub mod core;
pub use self::core::*;

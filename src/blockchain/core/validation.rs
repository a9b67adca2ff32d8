use crate::codec::has_leading_zeros;
use crate::error::ChainError;

use super::chain::Block;

/// Checks a block read back from the store under `expected_hash`.
pub fn validate_stored_block(block: &Block, expected_hash: &str) -> Result<(), ChainError> {
    if block.hash != expected_hash {
        return Err(ChainError::Corrupt(format!(
            "Block stored under {} claims hash {}",
            expected_hash, block.hash
        )));
    }

    let recomputed = block.calculate_hash();
    if recomputed != block.hash {
        return Err(ChainError::InvalidBlock(format!(
            "Hash mismatch at height {}. Expected {}, but got {}.",
            block.height, recomputed, block.hash
        )));
    }

    if !has_leading_zeros(&block.hash, block.difficulty) {
        return Err(ChainError::InvalidBlock(format!(
            "Invalid Proof-of-Work: hash {} does not meet difficulty {}.",
            block.hash, block.difficulty
        )));
    }

    if block.prev_hash.is_empty() != (block.height == 1) {
        return Err(ChainError::InvalidBlock(format!(
            "Only the block at height 1 may have an empty previous hash (height {}).",
            block.height
        )));
    }

    if !block.transactions.last().is_some_and(|tx| tx.is_coinbase()) {
        return Err(ChainError::InvalidBlock(format!(
            "Last transaction of block {} must be a coinbase transaction.",
            block.hash
        )));
    }
    Ok(())
}

/// `parent` must sit exactly one below `child`.
pub fn validate_link(child: &Block, parent: &Block) -> Result<(), ChainError> {
    if child.height != parent.height + 1 {
        return Err(ChainError::InvalidBlock(format!(
            "Invalid block height. Expected {}, but got {}.",
            child.height.saturating_sub(1),
            parent.height
        )));
    }
    Ok(())
}

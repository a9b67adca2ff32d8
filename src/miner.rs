//! Proof-of-work search.

use crate::blockchain::Block;
use crate::codec::has_leading_zeros;
use tracing::debug;

/// Searches nonces until the block hash starts with `difficulty` zero hex
/// digits. The timestamp is refreshed on every attempt. Blocks the calling
/// thread with no upper bound on the number of attempts.
pub fn mine_block(mut block: Block) -> Block {
    loop {
        block.timestamp = chrono::Utc::now().timestamp();
        let hash = block.calculate_hash();
        if has_leading_zeros(&hash, block.difficulty) {
            debug!(
                "Found hash {} at nonce {} (difficulty {})",
                hash, block.nonce, block.difficulty
            );
            block.hash = hash;
            return block;
        }
        block.nonce += 1;
    }
}

use crate::codec::{self, ContentHasher};
use crate::config::ChainParams;
use crate::error::{ChainError, Result};
use crate::mempool::{self, Mempool};
use crate::miner::mine_block;
use crate::persistence::Persistence;
use crate::transaction::Tx;
use crate::wallet::Wallet;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    /// Empty for the first block of the chain.
    pub prev_hash: String,
    pub height: u64,
    pub difficulty: u32,
    pub nonce: u64,
    /// Unix seconds of the successful mining attempt.
    pub timestamp: i64,
    /// Pending transactions followed by the coinbase, attached after mining.
    #[serde(default)]
    pub transactions: Vec<Tx>,
}

impl Block {
    /// An unmined block shell on top of `prev_hash`.
    pub fn new(prev_hash: String, height: u64, difficulty: u32) -> Self {
        Block {
            hash: String::new(),
            prev_hash,
            height,
            difficulty,
            nonce: 0,
            timestamp: 0,
            transactions: Vec::new(),
        }
    }

    /// Header hash. Transactions are attached only once mining has finished,
    /// so they are not covered.
    pub fn calculate_hash(&self) -> String {
        let mut hasher = ContentHasher::new("block");
        hasher
            .str(&self.prev_hash)
            .u64(self.height)
            .u32(self.difficulty)
            .u64(self.nonce)
            .i64(self.timestamp);
        hasher.finish_hex()
    }

    pub fn persist(&self, persistence: &dyn Persistence) -> Result<()> {
        persistence.save_block(&self.hash, &codec::to_bytes(self)?)
    }
}

/// Loads the block stored under `hash`.
pub fn find_block(persistence: &dyn Persistence, hash: &str) -> Result<Block> {
    let bytes = persistence
        .block(hash)?
        .ok_or_else(|| ChainError::NotFound(format!("block {}", hash)))?;
    codec::from_bytes(&bytes)
}

/// The persisted checkpoint: where the chain currently ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub newest_hash: String,
    pub height: u64,
    pub current_difficulty: u32,
}

/// Explicitly constructed ledger state handle.
///
/// Owns the head snapshot, the mempool and the local wallet. Everything
/// else is re-derived from the store on demand.
pub struct Blockchain {
    head: RwLock<ChainHead>,
    mining: Mutex<()>,
    pub(crate) mempool: Mempool,
    pub(crate) persistence: Box<dyn Persistence>,
    pub(crate) wallet: Wallet,
    pub(crate) params: ChainParams,
}

impl Blockchain {
    /// Restores the chain head from the checkpoint, or mines the first
    /// block when the store has none.
    pub fn open(
        persistence: Box<dyn Persistence>,
        wallet: Wallet,
        params: ChainParams,
    ) -> Result<Self> {
        if params.difficulty_interval == 0 {
            return Err(ChainError::ConfigError(
                "difficulty_interval must be at least 1".to_string(),
            ));
        }

        let blockchain = Blockchain {
            head: RwLock::new(ChainHead::default()),
            mining: Mutex::new(()),
            mempool: Mempool::new(),
            persistence,
            wallet,
            params,
        };

        match blockchain.persistence.checkpoint()? {
            Some(bytes) => {
                let head: ChainHead = codec::from_bytes(&bytes)?;
                let newest = match find_block(blockchain.persistence.as_ref(), &head.newest_hash) {
                    Err(ChainError::NotFound(_)) => {
                        return Err(ChainError::Corrupt(format!(
                            "Checkpoint points at missing block {}",
                            head.newest_hash
                        )))
                    }
                    other => other?,
                };
                if newest.height != head.height {
                    return Err(ChainError::Corrupt(format!(
                        "Checkpoint claims height {} but block {} is at height {}",
                        head.height, newest.hash, newest.height
                    )));
                }
                info!(
                    "Restored chain head {} at height {} (difficulty {})",
                    head.newest_hash, head.height, head.current_difficulty
                );
                *blockchain.head.write() = head;
            }
            None => {
                info!("No checkpoint found, mining the first block");
                blockchain.add_block()?;
            }
        }

        Ok(blockchain)
    }

    /// Consistent copy of the current head.
    pub fn head(&self) -> ChainHead {
        self.head.read().clone()
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn wallet_address(&self) -> &str {
        self.wallet.address()
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Transactions waiting for the next block.
    pub fn pending(&self) -> Vec<Tx> {
        self.mempool.pending()
    }

    /// Mines one block on top of the current head, confirming every pending
    /// transaction, and advances the head. Long-running; concurrent callers
    /// are serialised.
    pub fn add_block(&self) -> Result<Block> {
        let _mining = self.mining.lock();
        let head = self.head();
        let difficulty = self.difficulty_for(&head)?;

        self.create_block(&head.newest_hash, head.height + 1, difficulty, |block| {
            let next = ChainHead {
                newest_hash: block.hash.clone(),
                height: block.height,
                current_difficulty: block.difficulty,
            };
            self.persistence.save_checkpoint(&codec::to_bytes(&next)?)?;
            *self.head.write() = next;
            Ok(())
        })
    }

    /// Mines a block shell, then fills it from the mempool and persists it.
    /// `commit` runs while the mempool is still locked so no send can pick
    /// inputs between the drain and the head update.
    fn create_block<F>(&self, prev_hash: &str, height: u64, difficulty: u32, commit: F) -> Result<Block>
    where
        F: FnOnce(&Block) -> Result<()>,
    {
        let mut block = mine_block(Block::new(prev_hash.to_string(), height, difficulty));

        let mut pending = self.mempool.lock();
        block.transactions = mempool::tx_to_confirm(
            &mut pending,
            self.wallet.address(),
            self.params.miner_reward,
            height,
        );
        block.persist(self.persistence.as_ref())?;
        commit(&block)?;
        drop(pending);

        info!(
            "Mined block {} at height {} (difficulty {}, nonce {}, {} txs)",
            block.hash,
            block.height,
            block.difficulty,
            block.nonce,
            block.transactions.len()
        );
        Ok(block)
    }

    pub fn find_block(&self, hash: &str) -> Result<Block> {
        find_block(self.persistence.as_ref(), hash)
    }

    /// Difficulty the next block will be mined at.
    pub fn difficulty(&self) -> Result<u32> {
        self.difficulty_for(&self.head())
    }

    fn difficulty_for(&self, head: &ChainHead) -> Result<u32> {
        if head.height == 0 {
            Ok(self.params.default_difficulty)
        } else if head.height % self.params.difficulty_interval == 0 {
            self.recalculate_difficulty_for(head)
        } else {
            Ok(head.current_difficulty)
        }
    }

    /// Compares how long the last retarget window took against the target
    /// and moves the difficulty one step towards it.
    pub fn recalculate_difficulty(&self) -> Result<u32> {
        self.recalculate_difficulty_for(&self.head())
    }

    fn recalculate_difficulty_for(&self, head: &ChainHead) -> Result<u32> {
        let blocks = self.blocks_from(head)?;
        let anchor_offset = (self.params.difficulty_interval - 1) as usize;
        let (newest, anchor) = match (blocks.first(), blocks.get(anchor_offset)) {
            (Some(newest), Some(anchor)) => (newest, anchor),
            _ => {
                debug!("Chain shorter than one retarget window, keeping difficulty");
                return Ok(head.current_difficulty);
            }
        };

        let actual_minutes = (newest.timestamp - anchor.timestamp) / 60;
        let expected_minutes = self.params.expected_minutes();
        let allowed = self.params.allowed_range;

        let next = if actual_minutes <= expected_minutes - allowed {
            head.current_difficulty + 1
        } else if actual_minutes >= expected_minutes + allowed {
            head.current_difficulty.saturating_sub(1)
        } else {
            head.current_difficulty
        };

        info!(
            "Retarget at height {}: window took {} min (expected {}), difficulty {} -> {}",
            head.height, actual_minutes, expected_minutes, head.current_difficulty, next
        );
        Ok(next)
    }
}

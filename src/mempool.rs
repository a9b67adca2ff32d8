//! Pending transactions waiting for the next mined block.
//!
//! The pool lives only in memory and is lost on restart.

use crate::transaction::{Tx, UTxOut};
use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct Mempool {
    txs: Mutex<Vec<Tx>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the pending list. Held by a send while it picks
    /// inputs and by block creation while it drains the pool.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Tx>> {
        self.txs.lock()
    }

    /// Snapshot of the pending list in arrival order.
    pub fn pending(&self) -> Vec<Tx> {
        self.txs.lock().clone()
    }

    pub fn is_pending_spend(&self, utxo: &UTxOut) -> bool {
        is_pending_spend(&self.txs.lock(), utxo)
    }
}

/// True if some pending transaction already consumes `utxo`.
pub fn is_pending_spend(pending: &[Tx], utxo: &UTxOut) -> bool {
    pending.iter().any(|tx| tx.spends(utxo))
}

/// Takes every pending transaction and appends a freshly minted coinbase,
/// leaving `pending` empty.
pub fn tx_to_confirm(pending: &mut Vec<Tx>, miner_address: &str, reward: u64, height: u64) -> Vec<Tx> {
    let mut txs = std::mem::take(pending);
    txs.push(Tx::coinbase(miner_address, reward, height));
    txs
}

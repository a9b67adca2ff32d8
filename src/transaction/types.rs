/// Transaction types for coinledger
use crate::codec::ContentHasher;
use crate::error::Result;
use crate::wallet::Wallet;
use serde::{Deserialize, Serialize};

/// Signature marker carried by the single input of a coinbase transaction.
pub const COINBASE_SIGNATURE: &str = "COINBASE";

/// Output index carried by the single input of a coinbase transaction.
pub const COINBASE_INDEX: i64 = -1;

/// A transaction that can occur in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    /// Content hash, set once before signing and never recomputed.
    pub id: String,
    pub timestamp: i64,
    /// Height of the minted block for coinbase transactions, 0 otherwise.
    #[serde(default)]
    pub nonce: u64,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
}

/// Reference to an output of an earlier transaction, plus the proof that
/// its owner authorised spending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub tx_id: String,
    pub index: i64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub address: String,
    pub amount: u64,
}

/// An output not yet consumed by any confirmed or pending input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UTxOut {
    pub tx_id: String,
    pub index: i64,
    pub amount: u64,
}

impl TxIn {
    pub fn coinbase() -> Self {
        TxIn {
            tx_id: String::new(),
            index: COINBASE_INDEX,
            signature: COINBASE_SIGNATURE.to_string(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx_id.is_empty() && self.index == COINBASE_INDEX && self.signature == COINBASE_SIGNATURE
    }

    /// True if this input consumes `utxo`.
    pub fn spends(&self, utxo: &UTxOut) -> bool {
        self.tx_id == utxo.tx_id && self.index == utxo.index
    }
}

impl Tx {
    /// Builds a transaction and fixes its id over the given inputs/outputs.
    pub fn new(nonce: u64, tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>) -> Self {
        let mut tx = Tx {
            id: String::new(),
            timestamp: chrono::Utc::now().timestamp(),
            nonce,
            tx_ins,
            tx_outs,
        };
        tx.id = tx.calculate_id();
        tx
    }

    /// Mints `reward` to `miner_address` for the block at `height`.
    pub fn coinbase(miner_address: &str, reward: u64, height: u64) -> Self {
        Tx::new(
            height,
            vec![TxIn::coinbase()],
            vec![TxOut {
                address: miner_address.to_string(),
                amount: reward,
            }],
        )
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx_ins.len() == 1 && self.tx_ins[0].is_coinbase()
    }

    /// Hash over every field except `id`, in a fixed order.
    pub fn calculate_id(&self) -> String {
        let mut hasher = ContentHasher::new("tx");
        hasher.i64(self.timestamp).u64(self.nonce);
        hasher.u64(self.tx_ins.len() as u64);
        for tx_in in &self.tx_ins {
            hasher.str(&tx_in.tx_id).i64(tx_in.index).str(&tx_in.signature);
        }
        hasher.u64(self.tx_outs.len() as u64);
        for tx_out in &self.tx_outs {
            hasher.str(&tx_out.address).u64(tx_out.amount);
        }
        hasher.finish_hex()
    }

    /// Every input receives the same signature over the transaction id.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<()> {
        let signature = wallet.sign(&self.id)?;
        for tx_in in &mut self.tx_ins {
            tx_in.signature = signature.clone();
        }
        Ok(())
    }

    /// True if any input of this transaction consumes `utxo`.
    pub fn spends(&self, utxo: &UTxOut) -> bool {
        self.tx_ins.iter().any(|tx_in| tx_in.spends(utxo))
    }

    pub fn total_output(&self) -> u64 {
        self.tx_outs.iter().map(|tx_out| tx_out.amount).sum()
    }
}

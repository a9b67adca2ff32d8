//! Checking transaction inputs against confirmed outputs.

use crate::crypto;
use crate::error::ChainError;
use crate::transaction::types::{Tx, TxIn, TxOut};
use std::collections::HashMap;

/// Confirmed transactions keyed by id.
#[derive(Debug, Default, Clone)]
pub struct TxIndex {
    txs: HashMap<String, Tx>,
}

impl TxIndex {
    /// Indexes `txs` in iteration order; when two transactions share an id
    /// the first one seen wins, like a newest-first linear search would.
    pub fn from_txs<I: IntoIterator<Item = Tx>>(txs: I) -> Self {
        let mut index = HashMap::new();
        for tx in txs {
            index.entry(tx.id.clone()).or_insert(tx);
        }
        TxIndex { txs: index }
    }

    pub fn get(&self, id: &str) -> Option<&Tx> {
        self.txs.get(id)
    }

    /// The output an input points at, if both the transaction and the index exist.
    pub fn referenced_output(&self, tx_in: &TxIn) -> Option<&TxOut> {
        let index = usize::try_from(tx_in.index).ok()?;
        self.get(&tx_in.tx_id)?.tx_outs.get(index)
    }
}

impl Tx {
    /// Checks that every non-coinbase input points at a confirmed output and
    /// carries a valid signature of this id by that output's owner.
    pub fn validate(&self, confirmed: &TxIndex) -> Result<(), ChainError> {
        for tx_in in self.tx_ins.iter().filter(|tx_in| !tx_in.is_coinbase()) {
            let prev_tx = confirmed.get(&tx_in.tx_id).ok_or_else(|| {
                ChainError::InvalidTransaction(format!(
                    "Input references unknown transaction {}",
                    tx_in.tx_id
                ))
            })?;

            let owner = confirmed.referenced_output(tx_in).ok_or_else(|| {
                ChainError::InvalidTransaction(format!(
                    "Input references missing output {} of transaction {}",
                    tx_in.index, prev_tx.id
                ))
            })?;

            if !crypto::verify(&tx_in.signature, &self.id, &owner.address) {
                return Err(ChainError::InvalidTransaction(format!(
                    "Signature on input {}:{} does not match owner {}",
                    tx_in.tx_id, tx_in.index, owner.address
                )));
            }
        }
        Ok(())
    }
}

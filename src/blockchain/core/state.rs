//! Views derived from the persisted chain: block and transaction listings,
//! unspent outputs, balances, and building sends against them.
//!
//! Every query walks the chain from the head snapshot. No index survives
//! between calls.

use crate::error::{ChainError, Result};
use crate::mempool::is_pending_spend;
use crate::transaction::{Tx, TxIn, TxIndex, TxOut, UTxOut};
use std::collections::HashSet;
use tracing::{info, warn};

use super::chain::{find_block, Block, Blockchain, ChainHead};
use super::validation::{validate_link, validate_stored_block};

impl Blockchain {
    /// Every block from the head back to the first one, newest first.
    pub fn all_blocks(&self) -> Result<Vec<Block>> {
        self.blocks_from(&self.head())
    }

    pub(crate) fn blocks_from(&self, head: &ChainHead) -> Result<Vec<Block>> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut cursor = head.newest_hash.clone();

        while !cursor.is_empty() {
            let block = match find_block(self.persistence.as_ref(), &cursor) {
                Err(ChainError::NotFound(_)) => {
                    return Err(ChainError::Corrupt(format!(
                        "Block {} is referenced by the chain but missing from the store",
                        cursor
                    )))
                }
                other => other?,
            };
            validate_stored_block(&block, &cursor)?;
            if let Some(child) = blocks.last() {
                validate_link(child, &block)?;
            }
            cursor = block.prev_hash.clone();
            blocks.push(block);
        }

        if blocks.len() as u64 != head.height {
            return Err(ChainError::Corrupt(format!(
                "Head claims height {} but the chain holds {} blocks",
                head.height,
                blocks.len()
            )));
        }
        Ok(blocks)
    }

    /// Transactions of every block, newest block first.
    pub fn all_txs(&self) -> Result<Vec<Tx>> {
        Ok(self
            .all_blocks()?
            .into_iter()
            .flat_map(|block| block.transactions)
            .collect())
    }

    /// First confirmed transaction with this id, searching newest first.
    pub fn find_tx(&self, id: &str) -> Result<Option<Tx>> {
        Ok(self.all_txs()?.into_iter().find(|tx| tx.id == id))
    }

    /// Outputs owned by `address` that no confirmed or pending input consumes.
    pub fn unspent_outputs_for(&self, address: &str) -> Result<Vec<UTxOut>> {
        let (head, pending) = {
            let pending = self.mempool.lock();
            (self.head(), pending.clone())
        };
        let blocks = self.blocks_from(&head)?;
        unspent_outputs_in(&blocks, &confirmed_index(&blocks), address, &pending)
    }

    pub fn balance_for(&self, address: &str) -> Result<u64> {
        Ok(self
            .unspent_outputs_for(address)?
            .iter()
            .map(|utxo| utxo.amount)
            .sum())
    }

    /// Builds, signs and validates a send of `amount` from `from` to `to`
    /// without queueing it. Signs with the local wallet key.
    pub fn make_tx(&self, from: &str, to: &str, amount: u64) -> Result<Tx> {
        let (head, pending) = {
            let pending = self.mempool.lock();
            (self.head(), pending.clone())
        };
        self.make_tx_against(&head, &pending, from, to, amount)
    }

    /// Sends `amount` from the local wallet to `to` and queues it for the
    /// next block.
    pub fn add_tx(&self, to: &str, amount: u64) -> Result<Tx> {
        let mut pending = self.mempool.lock();
        let head = self.head();

        match self.make_tx_against(&head, &pending, self.wallet.address(), to, amount) {
            Ok(tx) => {
                info!("Queued transaction {} sending {} to {}", tx.id, amount, to);
                pending.push(tx.clone());
                Ok(tx)
            }
            Err(e) => {
                warn!("Rejected send of {} to {}: {}", amount, to, e);
                Err(e)
            }
        }
    }

    fn make_tx_against(
        &self,
        head: &ChainHead,
        pending: &[Tx],
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<Tx> {
        if amount == 0 {
            return Err(ChainError::InvalidTransaction(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let blocks = self.blocks_from(head)?;
        let confirmed = confirmed_index(&blocks);
        let utxos = unspent_outputs_in(&blocks, &confirmed, from, pending)?;

        let available: u64 = utxos.iter().map(|utxo| utxo.amount).sum();
        if available < amount {
            return Err(ChainError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let mut total = 0;
        let mut tx_ins = Vec::new();
        for utxo in utxos {
            if total >= amount {
                break;
            }
            total += utxo.amount;
            tx_ins.push(TxIn {
                tx_id: utxo.tx_id,
                index: utxo.index,
                signature: from.to_string(),
            });
        }

        let mut tx_outs = Vec::new();
        if total > amount {
            tx_outs.push(TxOut {
                address: from.to_string(),
                amount: total - amount,
            });
        }
        tx_outs.push(TxOut {
            address: to.to_string(),
            amount,
        });

        let mut tx = Tx::new(0, tx_ins, tx_outs);
        tx.sign(&self.wallet)?;
        tx.validate(&confirmed)?;
        Ok(tx)
    }
}

fn confirmed_index(blocks: &[Block]) -> TxIndex {
    TxIndex::from_txs(blocks.iter().flat_map(|block| block.transactions.iter().cloned()))
}

/// Single newest-first pass over `blocks`.
///
/// An input spending an output owned by `address` marks the id of the
/// transaction that created that output. Outputs of marked transactions are
/// skipped as a whole, which also hides sibling outputs of a partly spent
/// transaction. Outputs already reserved by `pending` are skipped too.
fn unspent_outputs_in(
    blocks: &[Block],
    confirmed: &TxIndex,
    address: &str,
    pending: &[Tx],
) -> Result<Vec<UTxOut>> {
    let mut spent_origins: HashSet<&str> = HashSet::new();
    let mut utxos = Vec::new();

    for block in blocks {
        for tx in &block.transactions {
            for tx_in in tx.tx_ins.iter().filter(|tx_in| !tx_in.is_coinbase()) {
                let referenced = confirmed.referenced_output(tx_in).ok_or_else(|| {
                    ChainError::Corrupt(format!(
                        "Confirmed transaction {} spends unknown output {}:{}",
                        tx.id, tx_in.tx_id, tx_in.index
                    ))
                })?;
                if referenced.address == address {
                    spent_origins.insert(tx_in.tx_id.as_str());
                }
            }

            if spent_origins.contains(tx.id.as_str()) {
                continue;
            }
            for (index, tx_out) in tx.tx_outs.iter().enumerate() {
                if tx_out.address != address {
                    continue;
                }
                let utxo = UTxOut {
                    tx_id: tx.id.clone(),
                    index: index as i64,
                    amount: tx_out.amount,
                };
                if !is_pending_spend(pending, &utxo) {
                    utxos.push(utxo);
                }
            }
        }
    }
    Ok(utxos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(prev: &Tx, index: i64) -> TxIn {
        TxIn {
            tx_id: prev.id.clone(),
            index,
            signature: String::new(),
        }
    }

    fn output(address: &str, amount: u64) -> TxOut {
        TxOut {
            address: address.to_string(),
            amount,
        }
    }

    fn block(height: u64, mut transactions: Vec<Tx>) -> Block {
        let mut block = Block::new(String::new(), height, 0);
        transactions.push(Tx::coinbase("miner", 50, height));
        block.transactions = transactions;
        block
    }

    fn unspent(blocks: &[Block], address: &str, pending: &[Tx]) -> Vec<UTxOut> {
        unspent_outputs_in(blocks, &confirmed_index(blocks), address, pending).unwrap()
    }

    #[test]
    fn test_spending_one_output_hides_its_siblings() {
        let reward = Tx::coinbase("alice", 50, 1);
        let split = Tx::new(
            0,
            vec![input(&reward, 0)],
            vec![output("alice", 30), output("alice", 20)],
        );
        let first = Block {
            transactions: vec![reward.clone()],
            ..Block::new(String::new(), 1, 0)
        };
        let second = block(2, vec![split.clone()]);

        let before = unspent(&[second.clone(), first.clone()], "alice", &[]);
        assert_eq!(before.len(), 2);
        assert!(before.iter().all(|utxo| utxo.tx_id == split.id));

        let spend = Tx::new(0, vec![input(&split, 0)], vec![output("bob", 30)]);
        let third = block(3, vec![spend]);
        assert!(unspent(&[third, second, first], "alice", &[]).is_empty());
    }

    #[test]
    fn test_marking_follows_referenced_owner() {
        let reward = Tx::coinbase("alice", 50, 1);
        let send = Tx::new(
            0,
            vec![input(&reward, 0)],
            vec![output("alice", 30), output("bob", 20)],
        );
        let bob_spend = Tx::new(0, vec![input(&send, 1)], vec![output("carol", 20)]);
        let blocks = [
            block(3, vec![bob_spend]),
            block(2, vec![send.clone()]),
            Block {
                transactions: vec![reward],
                ..Block::new(String::new(), 1, 0)
            },
        ];

        let alice = unspent(&blocks, "alice", &[]);
        assert_eq!(
            alice,
            vec![UTxOut {
                tx_id: send.id.clone(),
                index: 0,
                amount: 30,
            }]
        );
        assert!(unspent(&blocks, "bob", &[]).is_empty());
        assert_eq!(unspent(&blocks, "carol", &[]).len(), 1);
    }

    #[test]
    fn test_pending_inputs_reserve_outputs() {
        let reward = Tx::coinbase("alice", 50, 1);
        let blocks = [Block {
            transactions: vec![reward.clone()],
            ..Block::new(String::new(), 1, 0)
        }];
        let pending = Tx::new(0, vec![input(&reward, 0)], vec![output("bob", 50)]);

        assert_eq!(unspent(&blocks, "alice", &[]).len(), 1);
        assert!(unspent(&blocks, "alice", &[pending]).is_empty());
    }

    #[test]
    fn test_dangling_confirmed_input_is_corrupt() {
        let reward = Tx::coinbase("alice", 50, 1);
        let orphan = Tx::new(
            0,
            vec![TxIn {
                tx_id: "nowhere".to_string(),
                index: 0,
                signature: String::new(),
            }],
            vec![output("alice", 5)],
        );
        let blocks = [block(1, vec![orphan]), block(0, vec![reward])];

        let err = unspent_outputs_in(&blocks, &confirmed_index(&blocks), "alice", &[]).unwrap_err();
        assert!(matches!(err, ChainError::Corrupt(_)));
    }
}

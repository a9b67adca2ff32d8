//! Integration tests for the local wallet, sends and block confirmation

use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use coinledger::persistence::{Database, InMemoryPersistence};
use coinledger::{Blockchain, ChainError, ChainParams, Wallet};

/// Helper to open a ledger on a shared in-memory store
fn open_ledger(store: &InMemoryPersistence, wallet: Wallet) -> Result<Blockchain, ChainError> {
    Blockchain::open(Box::new(store.clone()), wallet, ChainParams::default())
}

/// Helper to get test directory
fn get_test_dir() -> Result<TempDir, Box<dyn std::error::Error>> {
    Ok(TempDir::new()?)
}

#[test]
fn test_fresh_ledger_mines_first_block() -> Result<(), Box<dyn std::error::Error>> {
    let miner = Wallet::generate();
    let miner_address = miner.address().to_string();
    let chain = open_ledger(&InMemoryPersistence::new(), miner)?;

    let head = chain.head();
    assert_eq!(head.height, 1);
    assert_eq!(head.current_difficulty, 2);

    let first = chain.find_block(&head.newest_hash)?;
    assert_eq!(first.height, 1);
    assert!(first.prev_hash.is_empty());
    assert!(first.hash.starts_with("00"));
    assert_eq!(first.transactions.len(), 1);
    assert!(first.transactions[0].is_coinbase());
    assert_eq!(first.transactions[0].tx_outs[0].address, miner_address);

    assert_eq!(chain.all_blocks()?.len(), 1);
    assert_eq!(chain.balance_for(&miner_address)?, 50);
    Ok(())
}

#[test]
fn test_send_and_confirm() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate();
    let alice_address = alice.address().to_string();
    let bob_address = Wallet::generate().address().to_string();
    let chain = open_ledger(&InMemoryPersistence::new(), alice)?;

    let tx = chain.add_tx(&bob_address, 20)?;
    assert_eq!(chain.pending(), vec![tx.clone()]);
    assert_eq!(tx.tx_ins.len(), 1);
    assert_eq!(tx.tx_outs.len(), 2);
    assert_eq!(tx.tx_outs[0].address, alice_address);
    assert_eq!(tx.tx_outs[0].amount, 30);
    assert_eq!(tx.tx_outs[1].address, bob_address);
    assert_eq!(tx.tx_outs[1].amount, 20);

    let block = chain.add_block()?;
    assert!(chain.pending().is_empty());
    assert_eq!(block.height, 2);
    assert_eq!(block.transactions.len(), 2);
    assert_eq!(block.transactions[0], tx);
    assert!(block.transactions[1].is_coinbase());

    assert_eq!(chain.balance_for(&bob_address)?, 20);
    assert_eq!(chain.balance_for(&alice_address)?, 50 - 20 + 50);
    Ok(())
}

#[test]
fn test_pending_send_reserves_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate();
    let alice_address = alice.address().to_string();
    let chain = open_ledger(&InMemoryPersistence::new(), alice)?;

    let reward = chain.unspent_outputs_for(&alice_address)?;
    assert_eq!(reward.len(), 1);

    let tx = chain.add_tx("bob", 10)?;
    assert_eq!(tx.tx_ins[0].tx_id, reward[0].tx_id);
    assert_eq!(tx.tx_ins[0].index, reward[0].index);

    assert!(chain.unspent_outputs_for(&alice_address)?.is_empty());
    assert_eq!(chain.balance_for(&alice_address)?, 0);
    assert!(chain.mempool().is_pending_spend(&reward[0]));

    // The reserved output cannot be spent twice.
    let err = chain.add_tx("carol", 10).unwrap_err();
    assert_eq!(err, ChainError::InsufficientFunds { requested: 10, available: 0 });
    assert_eq!(chain.pending().len(), 1);
    Ok(())
}

#[test]
fn test_insufficient_funds() -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&InMemoryPersistence::new(), Wallet::generate())?;

    let err = chain.add_tx("bob", 51).unwrap_err();
    assert_eq!(err, ChainError::InsufficientFunds { requested: 51, available: 50 });
    assert!(!err.is_fatal());
    assert!(chain.pending().is_empty());
    Ok(())
}

#[test]
fn test_zero_amount_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&InMemoryPersistence::new(), Wallet::generate())?;

    assert!(matches!(
        chain.add_tx("bob", 0),
        Err(ChainError::InvalidTransaction(_))
    ));
    assert!(chain.pending().is_empty());
    Ok(())
}

#[test]
fn test_foreign_outputs_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let store = InMemoryPersistence::new();
    let owner = Wallet::generate();
    let owner_address = owner.address().to_string();
    let _owner_chain = open_ledger(&store, owner)?;

    // A second node over the same store holds a different key.
    let intruder = open_ledger(&store, Wallet::generate())?;
    assert_eq!(intruder.head().height, 1);
    assert_eq!(intruder.balance_for(&owner_address)?, 50);

    let err = intruder.make_tx(&owner_address, "mallory", 10).unwrap_err();
    assert!(matches!(err, ChainError::InvalidTransaction(_)));
    assert!(intruder.pending().is_empty());
    Ok(())
}

#[test]
fn test_greedy_input_selection() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate();
    let alice_address = alice.address().to_string();
    let chain = open_ledger(&InMemoryPersistence::new(), alice)?;
    chain.add_block()?;
    let newest = chain.add_block()?;
    assert_eq!(chain.balance_for(&alice_address)?, 150);

    let tx = chain.add_tx("bob", 70)?;
    assert_eq!(tx.tx_ins.len(), 2);
    // Newest block's reward is consumed first.
    assert_eq!(tx.tx_ins[0].tx_id, newest.transactions[0].id);
    assert_eq!(tx.tx_outs[0].amount, 30);
    assert_eq!(tx.tx_outs[1].amount, 70);
    let signatures: Vec<_> = tx.tx_ins.iter().map(|tx_in| &tx_in.signature).collect();
    assert_eq!(signatures[0], signatures[1]);

    chain.add_block()?;
    assert_eq!(chain.balance_for("bob")?, 70);
    assert_eq!(chain.balance_for(&alice_address)?, 150 - 70 + 50);
    Ok(())
}

#[test]
fn test_spent_sibling_outputs_are_hidden() -> Result<(), Box<dyn std::error::Error>> {
    let alice = Wallet::generate();
    let alice_address = alice.address().to_string();
    let chain = open_ledger(&InMemoryPersistence::new(), alice)?;

    // Sending to ourselves leaves two outputs for alice in one transaction.
    let split = chain.add_tx(&alice_address, 20)?;
    chain.add_block()?;
    assert_eq!(chain.balance_for(&alice_address)?, 30 + 20 + 50);

    let tx = chain.add_tx("bob", 10)?;
    assert_eq!(tx.tx_ins.len(), 1);
    assert_eq!(tx.tx_ins[0].tx_id, split.id);
    chain.add_block()?;

    // The untouched 20 of the split is no longer listed.
    let utxos = chain.unspent_outputs_for(&alice_address)?;
    assert!(utxos.iter().all(|utxo| utxo.tx_id != split.id));
    assert_eq!(chain.balance_for(&alice_address)?, 20 + 50 + 50);
    assert_eq!(chain.balance_for("bob")?, 10);
    Ok(())
}

#[test]
fn test_transaction_queries() -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&InMemoryPersistence::new(), Wallet::generate())?;
    let sent = chain.add_tx("bob", 5)?;
    chain.add_block()?;

    let txs = chain.all_txs()?;
    assert_eq!(txs.len(), 3);
    // Newest block first: the send, its coinbase, then the first reward.
    assert_eq!(txs[0], sent);
    assert!(txs[1].is_coinbase());
    assert!(txs[2].is_coinbase());

    assert_eq!(chain.find_tx(&sent.id)?, Some(sent));
    assert_eq!(chain.find_tx("unknown")?, None);
    Ok(())
}

#[test]
fn test_difficulty_rises_after_fast_window() -> Result<(), Box<dyn std::error::Error>> {
    let chain = open_ledger(&InMemoryPersistence::new(), Wallet::generate())?;
    for _ in 0..4 {
        chain.add_block()?;
    }
    assert_eq!(chain.head().height, 5);
    assert_eq!(chain.head().current_difficulty, 2);

    // Five blocks in well under eight minutes.
    let block = chain.add_block()?;
    assert_eq!(block.difficulty, 3);
    assert!(block.hash.starts_with("000"));
    assert_eq!(chain.head().current_difficulty, 3);
    Ok(())
}

#[test]
fn test_concurrent_add_block() -> Result<(), Box<dyn std::error::Error>> {
    let chain = Arc::new(open_ledger(&InMemoryPersistence::new(), Wallet::generate())?);

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let chain = Arc::clone(&chain);
            thread::spawn(move || chain.add_block().map(|block| block.height))
        })
        .collect();

    let mut heights = Vec::new();
    for handle in handles {
        heights.push(handle.join().expect("miner thread panicked")?);
    }
    heights.sort_unstable();
    assert_eq!(heights, vec![2, 3, 4]);

    let blocks = chain.all_blocks()?;
    let walked: Vec<u64> = blocks.iter().map(|block| block.height).collect();
    assert_eq!(walked, vec![4, 3, 2, 1]);
    Ok(())
}

#[test]
fn test_reopen_restores_head() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = get_test_dir()?;
    let db_path = temp_dir.path().join("ledger.db");
    let wallet_path = temp_dir.path().join("node.wallet");

    let head = {
        let wallet = Wallet::open_or_create(&wallet_path)?;
        let chain = Blockchain::open(Box::new(Database::open(&db_path)?), wallet, ChainParams::default())?;
        chain.add_block()?;
        chain.head()
    };

    let wallet = Wallet::open_or_create(&wallet_path)?;
    let address = wallet.address().to_string();
    let chain = Blockchain::open(Box::new(Database::open(&db_path)?), wallet, ChainParams::default())?;
    assert_eq!(chain.head(), head);
    assert_eq!(chain.all_blocks()?.len(), 2);
    assert_eq!(chain.balance_for(&address)?, 100);
    Ok(())
}

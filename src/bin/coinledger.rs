#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use coinledger::config::{load_config_from, DEFAULT_CONFIG_PATH};
use coinledger::persistence::Database;
use coinledger::{Block, Blockchain, ChainError, Wallet};
use colored::Colorize;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coinledger", version, about = "Single-node proof-of-work ledger")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the chain head
    Status,
    /// Mine new blocks paying the local wallet
    Mine {
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Send from the local wallet and mine a block confirming it
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
    /// Balance of an address (defaults to the local wallet)
    Balance { address: Option<String> },
    /// Unspent outputs of an address (defaults to the local wallet)
    Utxos { address: Option<String> },
    /// Every block, newest first
    Blocks,
    /// A single block by hash
    Block { hash: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;
    let wallet = Wallet::open_or_create(&config.wallet.path)?;
    let chain = Blockchain::open(
        Box::new(Database::open(&config.database.path)?),
        wallet,
        config.chain.clone(),
    )?;

    match cli.command {
        Command::Status => print_status(&chain)?,
        Command::Mine { count } => {
            for _ in 0..count {
                let start_time = Instant::now();
                let block = chain.add_block()?;
                println!(
                    "{} block #{} in {:.3}s",
                    "⛏️  Mined".green().bold(),
                    block.height,
                    start_time.elapsed().as_secs_f64()
                );
                print_block(&block);
            }
        }
        Command::Send { to, amount } => {
            let tx = chain.add_tx(&to, amount)?;
            println!("{} {} ({} -> {})", "📤 Queued".cyan().bold(), tx.id, amount, to);
            let block = chain.add_block()?;
            println!("{} in block #{}", "✅ Confirmed".green().bold(), block.height);
        }
        Command::Balance { address } => {
            let address = address.unwrap_or_else(|| chain.wallet_address().to_string());
            println!("Address: {}", address);
            println!("Balance: {}", chain.balance_for(&address)?.to_string().bold());
        }
        Command::Utxos { address } => {
            let address = address.unwrap_or_else(|| chain.wallet_address().to_string());
            for utxo in chain.unspent_outputs_for(&address)? {
                println!("{}:{}  {}", utxo.tx_id, utxo.index, utxo.amount);
            }
        }
        Command::Blocks => {
            for block in chain.all_blocks()? {
                print_block(&block);
            }
        }
        Command::Block { hash } => match chain.find_block(&hash) {
            Ok(block) => print_block(&block),
            Err(ChainError::NotFound(_)) => println!("{} {}", "Block not found:".yellow(), hash),
            Err(e) => return Err(e.into()),
        },
    }

    Ok(())
}

fn print_status(chain: &Blockchain) -> Result<(), ChainError> {
    let head = chain.head();
    println!("{}", "⛓️  Chain status".bold());
    println!("  Height:       {}", head.height);
    println!("  Newest hash:  {}", head.newest_hash);
    println!("  Difficulty:   {}", head.current_difficulty);
    println!("  Next:         {}", chain.difficulty()?);
    println!("  Wallet:       {}", chain.wallet_address());
    Ok(())
}

fn print_block(block: &Block) {
    println!("┌ Block #{}", block.height);
    println!("│ Hash:       {}", block.hash);
    println!("│ Previous:   {}", if block.prev_hash.is_empty() { "-" } else { block.prev_hash.as_str() });
    println!("│ Timestamp:  {}", block.timestamp);
    println!("│ Difficulty: {}", block.difficulty);
    println!("│ Nonce:      {}", block.nonce);
    for tx in &block.transactions {
        let kind = if tx.is_coinbase() { "coinbase" } else { "transfer" };
        println!("│ {} {}  {} out", kind, tx.id, tx.total_output());
    }
    println!("└");
}

//! Create or fund a player account in the RocksDB store

use bingo_hall::{Ledger, RocksStore};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "seed_player")]
#[command(about = "Create or overwrite a player account", long_about = None)]
struct Args {
    /// Database directory
    #[arg(long, default_value = "./DB/bingo_data")]
    db_path: String,

    /// Player id
    #[arg(long)]
    player_id: u64,

    /// Display name shown in winner announcements
    #[arg(long)]
    name: String,

    /// Starting balance
    #[arg(long, default_value = "100")]
    balance: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("📂 Opening database: {}", args.db_path);
    let store = RocksStore::open(&args.db_path)?;

    if let Some(existing) = store.player(args.player_id)? {
        println!(
            "⚠️  Overwriting player {} ({}, balance {})",
            args.player_id, existing.name, existing.balance
        );
    }
    store.seed_player(args.player_id, &args.name, args.balance)?;

    let balance = store.balance(args.player_id).await?;
    println!("✅ Player {} '{}' has balance {}", args.player_id, args.name, balance);
    Ok(())
}

//! The `symbols` command: shows the current tradable universe and how it
//! would split across the two feed shards.

use anyhow::Result;

use surgewatch_binance::{partition_by_letter, BinanceClient};
use surgewatch_core::traits::MarketApi;
use surgewatch_core::ConfigLoader;

pub async fn run_symbols(config_path: &str) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let client = BinanceClient::new(config.binance.api_url.clone());

    let symbols = client.tradable_symbols().await?;
    let (first_half, second_half) = partition_by_letter(&symbols, config.universe.split_letter);

    println!(
        "{} tradable symbols, split at '{}'",
        symbols.len(),
        config.universe.split_letter
    );

    println!("\nShard A ({} symbols):", first_half.len());
    for symbol in &first_half {
        println!("  {symbol}");
    }

    println!("\nShard B ({} symbols):", second_half.len());
    for symbol in &second_half {
        println!("  {symbol}");
    }

    Ok(())
}

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "surgewatch")]
#[command(about = "Volume-surge alert screener for Binance USDT-M futures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the screener daemon (feed ingestion, detection, alert relay)
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Print the tradable universe and its shard split
    Symbols {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run { config } => {
            commands::run_daemon(&config).await?;
        }
        Commands::Symbols { config } => {
            commands::run_symbols(&config).await?;
        }
    }

    Ok(())
}

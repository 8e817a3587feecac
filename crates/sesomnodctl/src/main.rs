//! SesomNod Control - CLI client for the SesomNod Engine daemon.

mod client;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sesomnodctl")]
#[command(about = "SesomNod Engine - odds analysis and bankroll tracking", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health and pick statistics
    Status,

    /// Run the Dagens Kamp analysis now
    Analyze {
        /// Fire-and-forget instead of waiting for the result
        #[arg(long)]
        background: bool,
    },

    /// Show today's analyzed match
    Today,

    /// Show recent Dagens Kamp history
    History {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Send the daily summary to Telegram now
    Summary,

    /// Send a Telegram connectivity test message
    TestTelegram,

    /// Check today's match result now
    CheckResult,

    /// Show bankroll and goal progress
    Bankroll {
        /// Also print the ledger history
        #[arg(long)]
        history: bool,
    },

    /// Kelly stake calculator
    Kelly {
        /// Decimal odds
        odds: f64,
        /// True win probability (0..1)
        prob: f64,
        #[arg(long, default_value_t = 10_000.0)]
        bankroll: f64,
        #[arg(long, default_value_t = 0.25)]
        fraction: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = client::EngineClient::new(&cli.url);

    match cli.command {
        Commands::Status => commands::status(&client).await,
        Commands::Analyze { background } => commands::analyze(&client, background).await,
        Commands::Today => commands::today(&client).await,
        Commands::History { days } => commands::history(&client, days).await,
        Commands::Summary => commands::summary(&client).await,
        Commands::TestTelegram => commands::test_telegram(&client).await,
        Commands::CheckResult => commands::check_result(&client).await,
        Commands::Bankroll { history } => commands::bankroll(&client, history).await,
        Commands::Kelly {
            odds,
            prob,
            bankroll,
            fraction,
        } => commands::kelly(&client, odds, prob, bankroll, fraction).await,
    }
}

mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minute_data_core::request::DEFAULT_LOOKBACK_MINUTES;
use minute_data_providers::batch::BatchRunner;
use minute_data_providers::config::{FetchConfig, ProviderConfig, ProviderKind};
use minute_data_providers::provider;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "minute-data",
    about = "Fetch recent 1-minute candles for many symbols"
)]
struct Cli {
    /// Data provider: yahoo, finnhub, alpaca
    #[arg(long, default_value = "yahoo")]
    provider: String,

    /// Per-request timeout in seconds (overrides MINUTE_DATA_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Maximum concurrent symbol fetches (overrides MINUTE_DATA_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch candles once and print the JSON response
    Fetch {
        /// Symbols to fetch (comma-separated)
        #[arg(short, long)]
        symbols: String,

        /// How many minutes back to fetch (1-4320)
        #[arg(short, long, default_value_t = DEFAULT_LOOKBACK_MINUTES)]
        minutes: u32,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
}

fn fetch_config(cli: &Cli) -> FetchConfig {
    let mut config = FetchConfig::from_env();
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency.max(1);
    }
    config
}

fn create_runner(cli: &Cli) -> Result<BatchRunner> {
    let kind: ProviderKind = cli.provider.parse()?;
    let config = fetch_config(cli);
    let client =
        provider::build_client(config.timeout).context("failed to build HTTP client")?;
    let provider = ProviderConfig::from_env(kind).build(client);

    info!(
        "Using provider: {} (timeout {}s, concurrency {})",
        provider.name(),
        config.timeout.as_secs(),
        config.concurrency
    );
    Ok(BatchRunner::new(provider, &config))
}

async fn cmd_fetch(runner: &BatchRunner, symbols: &str, minutes: u32, pretty: bool) -> Result<()> {
    let response = runner
        .run(symbols, minutes)
        .await
        .context("batch rejected")?;

    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let runner = create_runner(&cli)?;

    match &cli.command {
        Commands::Fetch {
            symbols,
            minutes,
            pretty,
        } => {
            cmd_fetch(&runner, symbols, *minutes, *pretty).await?;
        }
        Commands::Serve { bind } => {
            let state = server::AppState {
                runner: Arc::new(runner),
            };
            server::serve(*bind, state).await?;
        }
    }

    Ok(())
}

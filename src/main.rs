use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gatefeed_rs::config::AppConfig;
use gatefeed_rs::market_data::adapters::{new_handler, supported_venues};
use gatefeed_rs::market_data::router;
use gatefeed_rs::market_data::types::CurrencyPair;
use gatefeed_rs::telemetry;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Stream normalised ticker prices from an exchange websocket.
#[derive(Debug, Parser)]
#[command(name = "gatefeed", version)]
struct Args {
    /// TOML config file; `GATEFEED__*` env vars override it
    #[arg(long, default_value = "config/gatefeed.toml")]
    config: PathBuf,

    /// Venue handler to run, overrides `venue` from the config
    #[arg(long)]
    venue: Option<String>,

    /// Pairs to subscribe (defaults to every configured ticker)
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<CurrencyPair>,

    /// Log filter, overrides `log_filter` from the config
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let args = Args::parse();
    let mut cfg = AppConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    telemetry::init_tracing(args.log.as_deref().unwrap_or(&cfg.log_filter));
    telemetry::init_metrics()?;

    if let Some(venue) = args.venue {
        cfg.venue = venue;
    }
    let tickers = if args.tickers.is_empty() {
        cfg.market.tickers.keys().cloned().collect()
    } else {
        args.tickers
    };

    let handler = new_handler(&cfg.venue, cfg.market, cfg.websocket.clone()).with_context(|| {
        format!(
            "venue {:?} (supported: {})",
            cfg.venue,
            supported_venues().collect::<Vec<_>>().join(", ")
        )
    })?;

    let (tx, mut rx) = mpsc::channel(cfg.websocket.max_buffer_size);
    let driver = tokio::spawn(router::run(handler, cfg.websocket, tickers, tx));

    loop {
        tokio::select! {
            response = rx.recv() => {
                let Some(response) = response else { break };
                for (pair, price) in &response.resolved {
                    info!(%pair, value = %price.value, volume = ?price.volume, ts = %price.timestamp, "price");
                }
                for (pair, unresolved) in &response.unresolved {
                    warn!(%pair, error = %unresolved.error, "unresolved");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                driver.abort();
                return Ok(());
            }
        }
    }

    driver.await??;
    Ok(())
}

//! Kite market tracker - entry point.
//!
//! Streams NSE ticks from the broker WebSocket feed, publishes a live
//! tracker view into Discord, raises threshold alerts, and rotates the
//! broker credential daily.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Kite market tracker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (also settable via KITE_TRACKER_CONFIG)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS crypto provider must be installed before any WS connection.
    kite_ws::init_crypto();

    let args = Args::parse();

    kite_telemetry::init_logging()?;
    info!("Starting kite-tracker v{}", env!("CARGO_PKG_VERSION"));

    let config = kite_tracker::AppConfig::load(args.config)?;
    let secrets = kite_tracker::Secrets::from_env()?;
    info!(ws_url = %config.ws_url, exchange = %config.exchange, "Configuration loaded");

    let app = kite_tracker::Application::bootstrap(config, secrets).await?;
    app.run().await?;

    Ok(())
}

//! pumpr - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Volume pumping market maker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PUMPR_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pumpr_telemetry::init_logging()?;

    info!("Starting pumpr v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > PUMPR_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PUMPR_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = pumpr_bot::AppConfig::from_file(&config_path)?;
    info!(
        exchange = %config.exchange.name,
        pair = %config.exchange.trading_pair,
        "Configuration loaded"
    );

    let mut app = pumpr_bot::Application::new(config)?;
    app.run_preflight().await;
    app.run().await?;

    Ok(())
}

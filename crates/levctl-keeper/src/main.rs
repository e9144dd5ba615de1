//! Leverage controller keeper - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Leverage rebalancing keeper (paper mode)
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via LEVCTL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Stop after this many ticks (overrides keeper.max_ticks)
    #[arg(long)]
    max_ticks: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    levctl_telemetry::init_logging()?;

    info!("Starting levctl keeper v{}", env!("CARGO_PKG_VERSION"));

    let config_path = levctl_keeper::AppConfig::resolve_path(args.config);
    info!(config_path = %config_path, "Loading configuration");

    let mut config = levctl_keeper::AppConfig::load(&config_path)?;
    if let Some(max_ticks) = args.max_ticks {
        config.keeper.max_ticks = max_ticks;
    }
    info!(
        variant = ?config.variant,
        target = %config.methodology.target_leverage_ratio,
        "Configuration loaded"
    );

    let mut app = levctl_keeper::Application::new(config)?;
    let summary = app.run().await?;
    info!(summary = %serde_json::to_string(&summary)?, "Run summary");

    Ok(())
}

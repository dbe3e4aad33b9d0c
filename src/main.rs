use clap::Parser;
use tracing_subscriber::EnvFilter;

use paralympics_dashboard::config::{AppConfig, Args};
use paralympics_dashboard::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_args(&Args::parse());

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    server::run(config).await?;
    Ok(())
}

//! Regwatch Server - Main entry point

use anyhow::Result;
use regwatch_common::logging::{init_logging, LogConfig};
use regwatch_server::{api, config::Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("regwatch-server")
        .filter_directives("regwatch_server=debug,regwatch_ingest=info,tower_http=info")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting Regwatch Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await?;

    info!("Server shut down gracefully");

    Ok(())
}

pub mod error;
pub mod models;
pub mod modules;
pub mod proxy;

use modules::logger;
use proxy::{AxumServer, TargetAllowlist};
use tracing::info;

/// Load config, start the gateway and serve until Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let config = modules::config::load_app_config()?;

    // Initialize logger
    logger::init_logger(&config.log);

    // Compiled-in allowlist; a malformed entry aborts startup
    let allowlist = TargetAllowlist::builtin()?;
    info!("Loaded {} proxy targets", allowlist.len());

    let (server, handle) = AxumServer::start(&config.proxy, allowlist).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    server.stop();
    handle.await?;

    Ok(())
}

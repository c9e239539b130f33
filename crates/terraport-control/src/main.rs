//! Terraport control service binary.
//!
//! Serves the upload, deploy and status API.

use tracing::info;
use tracing_subscriber::EnvFilter;

use terraport_control::{ControlConfig, ControlService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("terraport_control=info".parse()?),
        )
        .init();

    info!("terraport control service starting");

    // Load configuration
    let config = ControlConfig::load().unwrap_or_else(|e| {
        info!(error = %e, "failed to load config, using defaults");
        ControlConfig::default()
    });

    info!(
        listen_addr = %config.server.listen_addr,
        remote_host = %config.remote.host,
        image = %config.container.image,
        "configuration loaded"
    );

    ControlService::new(config).run().await?;

    Ok(())
}

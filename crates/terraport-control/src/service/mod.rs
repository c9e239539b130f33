//! Service lifecycle management.
//!
//! Provides the main service runner with signal handling and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use terraport_core::{ObjectArtifactStore, StoreType};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api;
use crate::config::ControlConfig;
use crate::error::{ControlError, ControlResult};
use crate::orchestrator::Orchestrator;
use crate::registry::MemoryRegistry;
use crate::remote::SshGateway;

/// The control service.
///
/// Wires the artifact store, credential registry and ssh gateway into an
/// orchestrator and serves the HTTP API until shutdown.
pub struct ControlService {
    config: ControlConfig,
    cancel: CancellationToken,
}

impl ControlService {
    /// Create a new control service with the given configuration.
    #[must_use]
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Run the control service.
    ///
    /// This will:
    /// 1. Open the artifact store
    /// 2. Create the credential registry and remote gateway
    /// 3. Start the HTTP API server
    /// 4. Wait for shutdown signal
    pub async fn run(&self) -> ControlResult<()> {
        let orchestrator = Arc::new(self.create_orchestrator()?);

        let state = api::AppState {
            orchestrator,
            max_upload_bytes: self.config.server.max_upload_bytes,
        };
        let app = api::router(state);

        info!(
            listen_addr = %self.config.server.listen_addr,
            "control service listening"
        );

        serve(self.config.server.listen_addr, app, self.cancel.clone()).await?;

        info!("control service shutdown complete");
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn create_orchestrator(&self) -> ControlResult<Orchestrator> {
        let artifacts = ObjectArtifactStore::new(&self.config.artifacts)?;
        info!(
            storage_type = ?self.config.artifacts.storage_type,
            path = %self.config.artifacts.path,
            "artifact store configured"
        );
        if self.config.artifacts.storage_type == StoreType::Memory {
            warn!("memory artifact store is private to this process; runner outputs will not be visible to status");
        }

        let gateway = Arc::new(SshGateway::new(&self.config.remote));
        info!(
            host = %self.config.remote.host,
            user = %self.config.remote.user,
            "remote gateway configured"
        );

        Ok(Orchestrator::new(
            Arc::new(MemoryRegistry::new()),
            Arc::new(artifacts),
            gateway.clone(),
            gateway,
            &self.config,
        ))
    }
}

/// Serve an axum router on a TCP address with graceful shutdown.
async fn serve(addr: SocketAddr, app: axum::Router, cancel: CancellationToken) -> ControlResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControlError::Config(format!("failed to bind TCP: {e}")))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| ControlError::Config(format!("server error: {e}")))?;
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
        () = cancel.cancelled() => {
            info!("shutdown requested");
        }
    }
}

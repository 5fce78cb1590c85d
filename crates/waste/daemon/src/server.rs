//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use std::sync::Arc;
use tokio::net::TcpListener;
use waste_ledger::WasteLedger;
use waste_storage::memory::InMemoryWasteStorage;
use waste_storage::postgres::PostgresWasteStorage;
use waste_storage::WasteStorage;

/// Waste ledger daemon server
pub struct Server {
    config: DaemonConfig,
    ledger: Arc<WasteLedger>,
    backend: &'static str,
}

impl Server {
    /// Create a new server, connecting the configured storage backend
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let taxonomy = config
            .material_taxonomy()
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        let (storage, backend): (Arc<dyn WasteStorage>, &'static str) = match &config.storage {
            StorageConfig::Memory => {
                tracing::warn!("using in-memory storage; ledger state is lost on shutdown");
                (Arc::new(InMemoryWasteStorage::new()), "memory")
            }
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => {
                let store = PostgresWasteStorage::connect_with_options(
                    url,
                    *max_connections,
                    *connect_timeout_secs,
                )
                .await?;
                tracing::info!(max_connections = *max_connections, "connected to postgres storage");
                (Arc::new(store), "postgres")
            }
        };

        Ok(Self {
            ledger: Arc::new(WasteLedger::new(storage, taxonomy)),
            backend,
            config,
        })
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.ledger, self.backend);
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, storage = self.backend, "waste daemon listening");

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("waste daemon shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{AdServerConfig, BuylineConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use buyline_adserver::{AdServerAdapter, SimulatedAdServer};
use buyline_notify::{BuyerNotifier, BuyerWebhookNotifier, ChatNotifier, OperatorNotifier};
use buyline_storage::{postgres::PostgresBuylineStorage, BuylineStorage, InMemoryBuylineStorage};
use buyline_workflow::{ApprovalExecutor, MediaBuyIntake, WorkflowStepManager};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Buyline daemon server
pub struct Server {
    config: BuylineConfig,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: BuylineConfig) -> DaemonResult<Self> {
        Ok(Self { config })
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let storage = build_storage(&self.config.storage).await?;
        let adserver: Arc<dyn AdServerAdapter> = build_adserver(&self.config.adserver);

        let operator: Arc<dyn OperatorNotifier> = Arc::new(ChatNotifier::new(
            self.config.notifications.chat_webhook_url.clone(),
        )?);
        let buyer: Arc<dyn BuyerNotifier> = Arc::new(BuyerWebhookNotifier::new()?);

        let steps = WorkflowStepManager::new(storage.clone(), operator);
        let intake = Arc::new(MediaBuyIntake::new(
            storage.clone(),
            adserver.clone(),
            steps,
        ));
        let executor = Arc::new(ApprovalExecutor::new(
            storage.clone(),
            adserver.clone(),
            buyer,
        ));

        let state = AppState::new(storage, intake, executor);
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Buyline daemon listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Buyline daemon shutting down");

        Ok(())
    }
}

async fn build_storage(config: &StorageConfig) -> DaemonResult<Arc<dyn BuylineStorage>> {
    match config {
        StorageConfig::Memory => {
            tracing::info!("Using in-memory storage");
            Ok(Arc::new(InMemoryBuylineStorage::new()))
        }
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            // The URL stays out of the logs, it can carry credentials.
            tracing::info!(
                max_connections = *max_connections,
                "Connecting to PostgreSQL"
            );
            let storage =
                PostgresBuylineStorage::connect_with_options(url, *max_connections, *connect_timeout_secs)
                    .await?;
            Ok(Arc::new(storage))
        }
    }
}

fn build_adserver(config: &AdServerConfig) -> Arc<SimulatedAdServer> {
    match config {
        AdServerConfig::Simulated {
            fail_create,
            fail_activate,
        } => {
            let adserver = SimulatedAdServer::new();
            adserver.set_fail_create(*fail_create);
            adserver.set_fail_activate(*fail_activate);
            if *fail_create || *fail_activate {
                tracing::warn!(
                    fail_create = *fail_create,
                    fail_activate = *fail_activate,
                    "Simulated ad server failure injection is on"
                );
            }
            Arc::new(adserver)
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to install terminate handler");
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

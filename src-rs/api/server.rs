use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;
use tracing::{info, warn};

use crate::api::handlers::{
    handle_cancel, handle_create, handle_delete, handle_filter, handle_get, handle_health,
    handle_list,
};
use crate::config::TrackerConfig;
use crate::error::ServerError;
use crate::task::{TaskManager, TaskStore};

pub fn router(manager: TaskManager) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/tasks", get(handle_list).post(handle_create))
        .route("/tasks/all", get(handle_list))
        .route("/tasks/filter", get(handle_filter))
        .route("/tasks/health", get(handle_health))
        .route("/tasks/:id", get(handle_get).delete(handle_delete))
        .route("/tasks/:id/cancel", put(handle_cancel))
        .with_state(manager)
}

pub struct TrackerServer {
    pub config: TrackerConfig,
    pub manager: TaskManager,
}

impl TrackerServer {
    pub fn new(config: TrackerConfig) -> Self {
        let store = Arc::new(TaskStore::with_shards(config.shard_count));
        let manager = TaskManager::new(store, config.task_duration);
        Self { config, manager }
    }

    /// Serves until Ctrl-C.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.serve_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serves until `signal` resolves, then drains connections for at most
    /// `shutdown_timeout` and cancels every task still running.
    pub async fn serve_until<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let builder =
            axum::Server::try_bind(&addr).map_err(|source| ServerError::Bind { addr, source })?;

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = builder
            .serve(router(self.manager.clone()).into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            });
        info!(%addr, "starting server");

        let mut server = tokio::spawn(server);
        tokio::select! {
            joined = &mut server => return flatten(joined),
            _ = signal => info!("shutting down server"),
        }

        let _ = stop_tx.send(());
        self.manager.shutdown();
        match tokio::time::timeout(self.config.shutdown_timeout, &mut server).await {
            Ok(joined) => flatten(joined)?,
            Err(_) => {
                warn!(timeout = ?self.config.shutdown_timeout, "graceful shutdown timed out");
                server.abort();
            }
        }
        info!("server stopped");
        Ok(())
    }
}

fn flatten(
    joined: Result<Result<(), hyper::Error>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    Ok(joined??)
}

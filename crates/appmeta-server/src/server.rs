use crate::{api, AppContext, Result, ServerConfig, ServerMetrics};
use appmeta_core::Metadata;
use appmeta_logger::{log_info, AsyncLogger};
use appmeta_store::{MemStore, Storage};
use appmeta_workpool::{ShutdownReport, WorkPool};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The metadata service: store, work pool and HTTP router
pub struct Server {
    config: ServerConfig,
    context: AppContext,
    pool: WorkPool<Metadata>,
}

impl Server {
    /// Create the store and start the work pool.
    ///
    /// Must be called from within a Tokio runtime. The logger is not stopped
    /// by the server; the caller stops it after [`Server::serve`] returns.
    pub fn new(config: ServerConfig, logger: AsyncLogger) -> Result<Self> {
        let storage: Arc<MemStore<Metadata>> = Arc::new(MemStore::with_logger(logger.clone()));
        let pool = WorkPool::start(config.pool.clone(), storage.clone(), logger.clone())?;
        let metrics = Arc::new(ServerMetrics::new()?);
        let context = AppContext::new(&pool, storage, logger, metrics);

        Ok(Server {
            config,
            context,
            pool,
        })
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn router(&self) -> Router {
        api::router(self.context.clone(), self.config.http.max_body_bytes)
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownReport>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.http.address()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain the work
    /// pool. Requests in flight finish before the pool is drained.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<ShutdownReport>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let app = self.router();
        let Server { context, pool, .. } = self;

        info!("HTTP server listening on {}", addr);
        log_info!(context.logger, "Listening ", addr, "...");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped, draining work pool");
        let report = pool.shutdown().await;
        log_info!(
            context.logger,
            "Work pool drained, ",
            context.storage.len(),
            " records stored"
        );
        Ok(report)
    }
}

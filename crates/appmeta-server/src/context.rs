use crate::ServerMetrics;
use appmeta_core::Metadata;
use appmeta_logger::AsyncLogger;
use appmeta_store::MemStore;
use appmeta_workpool::{Registry, WorkPool, WorkQueue};
use std::sync::Arc;

/// Dependencies shared by every request handler
#[derive(Clone)]
pub struct AppContext {
    pub storage: Arc<MemStore<Metadata>>,
    pub logger: AsyncLogger,
    pub queue: WorkQueue<Metadata>,
    pub workers: Registry<Metadata>,
    pub metrics: Arc<ServerMetrics>,
}

impl AppContext {
    /// Context whose queue and worker registry belong to `pool`
    pub fn new(
        pool: &WorkPool<Metadata>,
        storage: Arc<MemStore<Metadata>>,
        logger: AsyncLogger,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        AppContext {
            storage,
            logger,
            queue: pool.queue(),
            workers: pool.registry(),
            metrics,
        }
    }
}

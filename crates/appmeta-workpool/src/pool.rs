use crate::dispatcher::Dispatcher;
use crate::queue::{QueueReceiver, WorkQueue};
use crate::registry::Registry;
use crate::worker::{Worker, WorkerId};
use crate::{PoolConfig, Result};
use appmeta_logger::AsyncLogger;
use appmeta_store::{Keyed, Storage};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What the shutdown drain managed to do before its deadline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every accepted item was handed to a worker
    pub queue_drained: bool,
    pub workers_stopped: usize,
    /// Workers that ended by panicking
    pub workers_failed: usize,
    /// Tasks still running at the deadline and aborted
    pub tasks_aborted: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.queue_drained && self.workers_failed == 0 && self.tasks_aborted == 0
    }
}

/// A fixed set of workers fed by one dispatcher from a bounded queue
pub struct WorkPool<P> {
    config: PoolConfig,
    queue: WorkQueue<P>,
    registry: Registry<P>,
    worker_ids: Vec<WorkerId>,
    dispatcher: Option<JoinHandle<()>>,
    workers: JoinSet<()>,
    stop_dispatch: CancellationToken,
    stop_workers: CancellationToken,
}

impl<P> WorkPool<P>
where
    P: Keyed + Send + 'static,
{
    /// Build the queue, registry, workers and dispatcher and start them.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: PoolConfig,
        storage: Arc<dyn Storage<P>>,
        logger: AsyncLogger,
    ) -> Result<Self> {
        config.validate()?;
        let (queue, receiver) = WorkQueue::bounded(config.queue_capacity)?;
        Self::with_queue(config, queue, receiver, storage, logger)
    }

    /// Start the pool on a queue built beforehand, which may already hold
    /// work. The queue's own capacity takes precedence over
    /// `config.queue_capacity`.
    pub fn with_queue(
        config: PoolConfig,
        queue: WorkQueue<P>,
        receiver: QueueReceiver<P>,
        storage: Arc<dyn Storage<P>>,
        logger: AsyncLogger,
    ) -> Result<Self> {
        config.validate()?;

        let (registry, parker) = Registry::new(config.max_workers);
        let stop_dispatch = CancellationToken::new();
        let stop_workers = CancellationToken::new();

        let mut workers = JoinSet::new();
        let mut worker_ids = Vec::with_capacity(config.max_workers);
        for _ in 0..config.max_workers {
            let worker = Worker::new(parker.clone(), storage.clone(), logger.clone());
            worker_ids.push(worker.id());
            workers.spawn(worker.run(stop_workers.clone()));
        }
        // Workers hold the only parkers, so the registry closes once they are all gone.
        drop(parker);

        let dispatcher = Dispatcher::new(
            receiver,
            registry.clone(),
            logger,
            config.dispatch_mode,
            config.max_pending_handoffs,
        );
        let dispatcher = tokio::spawn(dispatcher.run(stop_dispatch.clone()));

        info!(
            "Work pool started with {} workers, queue capacity {}, {} dispatch",
            config.max_workers,
            queue.capacity(),
            config.dispatch_mode
        );

        Ok(WorkPool {
            config,
            queue,
            registry,
            worker_ids,
            dispatcher: Some(dispatcher),
            workers,
            stop_dispatch,
            stop_workers,
        })
    }

    /// A producer handle for submitting work
    pub fn queue(&self) -> WorkQueue<P> {
        self.queue.clone()
    }

    pub fn worker_ids(&self) -> &[WorkerId] {
        &self.worker_ids
    }

    /// Workers currently waiting for an assignment
    pub fn idle_workers(&self) -> usize {
        self.registry.idle()
    }

    /// Shared view of the idle-worker registry, for occupancy reporting
    pub fn registry(&self) -> Registry<P> {
        self.registry.clone()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Drain and stop the pool.
    ///
    /// The queue is closed first, so new and blocked submissions fail with
    /// `QueueClosed`. Items already accepted are dispatched and processed,
    /// then the workers are stopped. Whatever is still running when
    /// `shutdown_timeout_secs` expires is aborted. The logger is left
    /// running for the caller to stop.
    pub async fn shutdown(mut self) -> ShutdownReport {
        let deadline = Instant::now() + self.config.shutdown_timeout();
        let mut report = ShutdownReport::default();

        info!("Draining work queue");
        self.stop_dispatch.cancel();
        if let Some(mut dispatcher) = self.dispatcher.take() {
            match timeout_at(deadline, &mut dispatcher).await {
                Ok(Ok(())) => report.queue_drained = true,
                Ok(Err(e)) => error!("Dispatcher task failed: {}", e),
                Err(_) => {
                    warn!("Shutdown deadline reached before the work queue was drained");
                    dispatcher.abort();
                    report.tasks_aborted += 1;
                }
            }
        }

        info!("Stopping {} workers", self.workers.len());
        self.stop_workers.cancel();
        loop {
            match timeout_at(deadline, self.workers.join_next()).await {
                Ok(Some(Ok(()))) => report.workers_stopped += 1,
                Ok(Some(Err(e))) => {
                    error!("Worker task failed: {}", e);
                    report.workers_failed += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("Shutdown deadline reached, aborting {} workers", self.workers.len());
                    report.tasks_aborted += self.workers.len();
                    self.workers.abort_all();
                    break;
                }
            }
        }

        info!(
            "Work pool stopped: {} workers stopped, {} failed, {} aborted",
            report.workers_stopped, report.workers_failed, report.tasks_aborted
        );
        report
    }
}

/// Dropping a pool without [`WorkPool::shutdown`] aborts it: the dispatcher
/// and its pending hand-offs are aborted and the workers go with the
/// `JoinSet`. Receipts of work not yet stored resolve to `Lost`.
impl<P> Drop for WorkPool<P> {
    fn drop(&mut self) {
        self.stop_dispatch.cancel();
        self.stop_workers.cancel();
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
    }
}

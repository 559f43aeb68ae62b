use crate::queue::{Job, QueueReceiver};
use crate::registry::Registry;
use appmeta_logger::{log_error, log_info, log_warning, AsyncLogger};
use appmeta_store::Keyed;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// How dequeued items are paired with idle workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Each item gets its own hand-off task. The dispatch loop never waits
    /// for a worker, but concurrent hand-offs race for handles, so items
    /// may be assigned out of queue order.
    #[default]
    Racing,
    /// The dispatch loop pairs each item with a handle itself. Assignment
    /// follows queue order; the loop stalls while no worker is idle.
    Ordered,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Racing => write!(f, "racing"),
            DispatchMode::Ordered => write!(f, "ordered"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "racing" => Ok(DispatchMode::Racing),
            "ordered" => Ok(DispatchMode::Ordered),
            other => Err(format!("unknown dispatch mode: {}", other)),
        }
    }
}

/// Single loop draining the work queue in FIFO order
pub(crate) struct Dispatcher<P> {
    receiver: QueueReceiver<P>,
    registry: Registry<P>,
    logger: AsyncLogger,
    mode: DispatchMode,
    max_pending: usize,
}

impl<P> Dispatcher<P>
where
    P: Keyed + Send + 'static,
{
    pub(crate) fn new(
        receiver: QueueReceiver<P>,
        registry: Registry<P>,
        logger: AsyncLogger,
        mode: DispatchMode,
        max_pending_handoffs: usize,
    ) -> Self {
        Dispatcher {
            receiver,
            registry,
            logger,
            mode,
            max_pending: max_pending_handoffs.max(1),
        }
    }

    /// Dispatch until cancelled, then close the queue, dispatch whatever was
    /// already accepted and wait for every pending hand-off.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        let mut pending = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                job = self.receiver.recv() => match job {
                    Some(job) => self.dispatch(job, &mut pending).await,
                    None => break,
                },
                Some(result) = pending.join_next(), if !pending.is_empty() => {
                    handoff_finished(result)
                }
            }
        }

        self.receiver.close();
        while let Some(job) = self.receiver.recv().await {
            self.dispatch(job, &mut pending).await;
        }
        debug!("Work queue drained, waiting for {} pending hand-offs", pending.len());

        while let Some(result) = pending.join_next().await {
            handoff_finished(result);
        }
    }

    async fn dispatch(&self, job: Job<P>, pending: &mut JoinSet<()>) {
        log_info!(
            self.logger,
            "Work ",
            job.item.id(),
            " received from work queue (seq ",
            job.seq,
            ", key ",
            job.item.payload().storage_key(),
            ")"
        );

        match self.mode {
            DispatchMode::Ordered => hand_off(&self.registry, &self.logger, job).await,
            DispatchMode::Racing => {
                // Finished hand-offs stay in the set until joined.
                while let Some(result) = pending.try_join_next() {
                    handoff_finished(result);
                }
                while pending.len() >= self.max_pending {
                    match pending.join_next().await {
                        Some(result) => handoff_finished(result),
                        None => break,
                    }
                }

                let registry = self.registry.clone();
                let logger = self.logger.clone();
                pending.spawn(async move { hand_off(&registry, &logger, job).await });
            }
        }
    }
}

fn handoff_finished(result: std::result::Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Hand-off task failed: {}", e);
    }
}

/// Deliver a job to the next idle worker, skipping handles of workers that
/// have already stopped.
async fn hand_off<P>(registry: &Registry<P>, logger: &AsyncLogger, mut job: Job<P>)
where
    P: Send + 'static,
{
    loop {
        let Some(handle) = registry.take().await else {
            log_error!(logger, "Worker registry closed, work ", job.item.id(), " dropped");
            return;
        };
        let worker_id = handle.worker_id();
        let item_id = job.item.id();
        log_info!(logger, "Available worker ", worker_id, " received from registry");

        match handle.deliver(job) {
            Ok(()) => {
                log_info!(logger, "Work ", item_id, " has been assigned to worker ", worker_id);
                return;
            }
            Err(returned) => {
                log_warning!(
                    logger,
                    "Worker ",
                    worker_id,
                    " has stopped, reassigning work ",
                    item_id
                );
                job = returned;
            }
        }
    }
}

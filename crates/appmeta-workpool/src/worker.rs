use crate::queue::{Completion, Job};
use crate::registry::{Parker, WorkerHandle};
use appmeta_logger::{log_info, AsyncLogger};
use appmeta_store::{Keyed, Storage};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique worker identifier
pub type WorkerId = Uuid;

/// Long-lived task that stores the payload of each assigned work item
pub(crate) struct Worker<P> {
    id: WorkerId,
    parker: Parker<P>,
    storage: Arc<dyn Storage<P>>,
    logger: AsyncLogger,
}

impl<P> Worker<P>
where
    P: Keyed + Send + 'static,
{
    pub(crate) fn new(
        parker: Parker<P>,
        storage: Arc<dyn Storage<P>>,
        logger: AsyncLogger,
    ) -> Self {
        Worker {
            id: Uuid::new_v4(),
            parker,
            storage,
            logger,
        }
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.id
    }

    /// Park a handle, wait for an assignment, process it, repeat.
    ///
    /// Shutdown is only observed between assignments, so an item already
    /// delivered is always processed.
    pub(crate) async fn run(self, shutdown: CancellationToken) {
        loop {
            let (slot, mut assignment) = oneshot::channel();

            tokio::select! {
                parked = self.parker.park(WorkerHandle::new(self.id, slot)) => {
                    if parked.is_err() {
                        return;
                    }
                }
                _ = shutdown.cancelled() => break,
            }
            log_info!(self.logger, "Worker ", self.id, " registered its handle with the registry");

            tokio::select! {
                biased;

                job = &mut assignment => match job {
                    Ok(job) => self.process(job),
                    // The handle was dropped undelivered; park a new one.
                    Err(_) => continue,
                },
                _ = shutdown.cancelled() => break,
            }
        }

        log_info!(self.logger, "Worker ", self.id, " is shutting down");
    }

    fn process(&self, job: Job<P>) {
        let Job { item, seq, receipt } = job;
        let item_id = item.id();
        let key = item.payload().storage_key().to_string();
        log_info!(
            self.logger,
            "Worker ",
            self.id,
            " processing work ",
            item_id,
            " (seq ",
            seq,
            ")"
        );

        self.storage.insert(key.clone(), item.into_payload());

        if let Some(receipt) = receipt {
            let _ = receipt.send(Completion {
                item_id,
                worker_id: self.id,
                key,
            });
        }
        log_info!(self.logger, "Work ", item_id, " has been completed by worker ", self.id);
    }
}

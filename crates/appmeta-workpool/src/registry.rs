use crate::queue::Job;
use crate::worker::WorkerId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

/// A worker's single-use point of assignment.
///
/// Each idle cycle the worker parks a fresh handle; exactly one job can be
/// delivered through it.
pub struct WorkerHandle<P> {
    worker_id: WorkerId,
    slot: oneshot::Sender<Job<P>>,
}

impl<P> WorkerHandle<P> {
    pub(crate) fn new(worker_id: WorkerId, slot: oneshot::Sender<Job<P>>) -> Self {
        WorkerHandle { worker_id, slot }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Hand a job to the worker. Returns the job if the worker has stopped.
    pub(crate) fn deliver(self, job: Job<P>) -> std::result::Result<(), Job<P>> {
        self.slot.send(job)
    }
}

/// Bounded set of idle worker handles, sized to the worker count.
///
/// Only `take` and the occupancy count are offered; the registry is never
/// iterated. The registry keeps no sender of its own: once every worker's
/// [`Parker`] is gone and the parked handles are used up, `take` returns
/// `None`.
pub struct Registry<P> {
    tx: mpsc::WeakSender<WorkerHandle<P>>,
    rx: Arc<Mutex<mpsc::Receiver<WorkerHandle<P>>>>,
    capacity: usize,
}

impl<P> Clone for Registry<P> {
    fn clone(&self) -> Self {
        Registry {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

/// A worker's side of the registry
pub(crate) struct Parker<P> {
    tx: mpsc::Sender<WorkerHandle<P>>,
}

impl<P> Clone for Parker<P> {
    fn clone(&self) -> Self {
        Parker { tx: self.tx.clone() }
    }
}

impl<P: Send + 'static> Parker<P> {
    /// Make a handle available; suspends while the registry is full
    pub(crate) async fn park(
        &self,
        handle: WorkerHandle<P>,
    ) -> std::result::Result<(), WorkerHandle<P>> {
        self.tx.send(handle).await.map_err(|e| e.0)
    }
}

impl<P: Send + 'static> Registry<P> {
    pub(crate) fn new(capacity: usize) -> (Self, Parker<P>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let registry = Registry {
            tx: tx.downgrade(),
            rx: Arc::new(Mutex::new(rx)),
            capacity,
        };
        (registry, Parker { tx })
    }

    /// Wait for the next idle handle. `None` once no worker can park again.
    pub(crate) async fn take(&self) -> Option<WorkerHandle<P>> {
        self.rx.lock().await.recv().await
    }

    /// Handles currently parked by live workers
    pub fn idle(&self) -> usize {
        self.tx
            .upgrade()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkItem;
    use std::time::Duration;
    use uuid::Uuid;

    fn handle(registry_slots: &mut Vec<oneshot::Receiver<Job<u32>>>) -> WorkerHandle<u32> {
        let (tx, rx) = oneshot::channel();
        registry_slots.push(rx);
        WorkerHandle::new(Uuid::new_v4(), tx)
    }

    #[tokio::test]
    async fn test_idle_handles_never_exceed_capacity() {
        let (registry, parker) = Registry::new(2);
        let mut slots = Vec::new();

        parker.park(handle(&mut slots)).await.ok().unwrap();
        parker.park(handle(&mut slots)).await.ok().unwrap();
        assert_eq!(registry.idle(), 2);

        let third =
            tokio::time::timeout(Duration::from_millis(100), parker.park(handle(&mut slots))).await;
        assert!(third.is_err(), "parking past capacity must block");
        assert_eq!(registry.idle(), registry.capacity());

        registry.take().await.unwrap();
        assert_eq!(registry.idle(), 1);
    }

    #[tokio::test]
    async fn test_deliver_reaches_parked_worker() {
        let (registry, parker) = Registry::new(1);
        let (tx, rx) = oneshot::channel();
        let worker_id = Uuid::new_v4();
        parker.park(WorkerHandle::new(worker_id, tx)).await.ok().unwrap();

        let taken = registry.take().await.unwrap();
        assert_eq!(taken.worker_id(), worker_id);
        assert!(taken.deliver(Job::new(WorkItem::new(7u32), 0, None)).is_ok());
        assert_eq!(*rx.await.unwrap().item().payload(), 7);
    }

    #[tokio::test]
    async fn test_deliver_to_stopped_worker_returns_job() {
        let (registry, parker) = Registry::new(1);
        let (tx, rx) = oneshot::channel();
        parker.park(WorkerHandle::new(Uuid::new_v4(), tx)).await.ok().unwrap();
        drop(rx);

        let item = WorkItem::new(9u32);
        let id = item.id();
        let returned = registry
            .take()
            .await
            .unwrap()
            .deliver(Job::new(item, 3, None))
            .err()
            .expect("delivery to a stopped worker must fail");
        assert_eq!(returned.item().id(), id);
        assert_eq!(returned.seq(), 3);
    }

    #[tokio::test]
    async fn test_take_ends_once_every_parker_is_gone() {
        let (registry, parker) = Registry::new(2);
        let (tx, _rx) = oneshot::channel::<Job<u32>>();
        let worker_id = Uuid::new_v4();
        parker.park(WorkerHandle::new(worker_id, tx)).await.ok().unwrap();
        let second = parker.clone();
        drop(parker);

        assert_eq!(registry.idle(), 1);
        drop(second);
        assert_eq!(registry.idle(), 0);

        // The handle parked before the workers went away is still handed out.
        assert_eq!(registry.take().await.unwrap().worker_id(), worker_id);
        let ended = tokio::time::timeout(Duration::from_secs(1), registry.take())
            .await
            .expect("take must not wait for workers that are gone");
        assert!(ended.is_none());
    }
}

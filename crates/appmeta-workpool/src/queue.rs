use crate::worker::WorkerId;
use crate::{PoolError, Result, WorkId, WorkItem};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Outcome reported by the worker that stored an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub item_id: WorkId,
    pub worker_id: WorkerId,
    /// Storage key the payload was inserted under
    pub key: String,
}

/// A work item in transit, stamped with its position in the queue
pub struct Job<P> {
    pub(crate) item: WorkItem<P>,
    pub(crate) seq: u64,
    pub(crate) receipt: Option<oneshot::Sender<Completion>>,
}

impl<P> Job<P> {
    pub(crate) fn new(
        item: WorkItem<P>,
        seq: u64,
        receipt: Option<oneshot::Sender<Completion>>,
    ) -> Self {
        Job { item, seq, receipt }
    }

    pub fn item(&self) -> &WorkItem<P> {
        &self.item
    }

    /// Submission sequence number, increasing in queue order
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Resolves once a worker has stored the item.
///
/// If the item is dropped before that (its worker crashed, or the pool was
/// aborted), the receipt resolves to [`PoolError::Lost`]. The item is not
/// redelivered.
#[derive(Debug)]
pub struct Receipt {
    id: WorkId,
    rx: oneshot::Receiver<Completion>,
}

impl Receipt {
    pub fn id(&self) -> WorkId {
        self.id
    }

    pub async fn wait(self) -> Result<Completion> {
        self.rx.await.map_err(|_| PoolError::Lost(self.id))
    }
}

/// Producer handle for the bounded inbound queue.
///
/// A full queue suspends `submit` until the dispatcher frees a slot. This is
/// the only admission control in the pool.
pub struct WorkQueue<P> {
    tx: mpsc::Sender<Job<P>>,
    next_seq: Arc<Mutex<u64>>,
}

impl<P> Clone for WorkQueue<P> {
    fn clone(&self) -> Self {
        WorkQueue {
            tx: self.tx.clone(),
            next_seq: self.next_seq.clone(),
        }
    }
}

/// Consuming end of a [`WorkQueue`], owned by the dispatcher
pub struct QueueReceiver<P> {
    rx: mpsc::Receiver<Job<P>>,
}

impl<P: Send + 'static> WorkQueue<P> {
    /// Create a queue holding at most `capacity` items
    pub fn bounded(capacity: usize) -> Result<(WorkQueue<P>, QueueReceiver<P>)> {
        if capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(capacity);
        let queue = WorkQueue {
            tx,
            next_seq: Arc::new(Mutex::new(0)),
        };
        Ok((queue, QueueReceiver { rx }))
    }

    /// Enqueue an item without tracking its outcome
    pub async fn submit(&self, item: WorkItem<P>) -> Result<()> {
        self.enqueue(item, None).await
    }

    /// Enqueue an item and get a receipt for its completion
    pub async fn submit_with_receipt(&self, item: WorkItem<P>) -> Result<Receipt> {
        let (tx, rx) = oneshot::channel();
        let id = item.id();
        self.enqueue(item, Some(tx)).await?;
        Ok(Receipt { id, rx })
    }

    async fn enqueue(
        &self,
        item: WorkItem<P>,
        receipt: Option<oneshot::Sender<Completion>>,
    ) -> Result<()> {
        let permit = self.tx.reserve().await.map_err(|_| PoolError::QueueClosed)?;

        // Stamp and send under one lock so sequence order is queue order.
        let mut next_seq = self.next_seq.lock();
        permit.send(Job::new(item, *next_seq, receipt));
        *next_seq += 1;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<P> QueueReceiver<P> {
    pub(crate) async fn recv(&mut self) -> Option<Job<P>> {
        self.rx.recv().await
    }

    /// Refuse new submissions, releasing blocked submitters with
    /// [`PoolError::QueueClosed`]. Buffered items can still be received.
    pub(crate) fn close(&mut self) {
        self.rx.close();
    }
}

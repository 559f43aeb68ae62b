use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique work item identifier
pub type WorkId = Uuid;

/// One unit of deferred work. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem<P> {
    id: WorkId,
    payload: P,
}

impl<P> WorkItem<P> {
    /// Wrap a payload under a fresh identity
    pub fn new(payload: P) -> Self {
        WorkItem {
            id: Uuid::new_v4(),
            payload,
        }
    }

    pub fn with_id(id: WorkId, payload: P) -> Self {
        WorkItem { id, payload }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

//! Storage collaborator used by the workers and the search endpoint.

mod memory;
mod query;

pub use memory::MemStore;
pub use query::{search, SearchParams};

/// Key/value storage shared by all workers.
///
/// Inserts are infallible and must be safe under concurrent calls from
/// distinct workers.
pub trait Storage<V>: Send + Sync {
    /// Insert or replace the value stored under `key`
    fn insert(&self, key: String, value: V);

    fn read(&self, key: &str) -> Option<V>;

    /// Number of stored records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Payloads that carry their own storage key
pub trait Keyed {
    fn storage_key(&self) -> &str;
}

impl Keyed for appmeta_core::Metadata {
    fn storage_key(&self) -> &str {
        &self.version
    }
}

use crate::Storage;
use appmeta_logger::{log_info, AsyncLogger};
use dashmap::DashMap;

/// Concurrent in-memory key/value store
pub struct MemStore<V> {
    records: DashMap<String, V>,
    logger: Option<AsyncLogger>,
}

impl<V: Clone + Send + Sync> MemStore<V> {
    pub fn new() -> Self {
        MemStore {
            records: DashMap::new(),
            logger: None,
        }
    }

    /// Store that reports each insert at INFO
    pub fn with_logger(logger: AsyncLogger) -> Self {
        logger.info("In-memory store has been created");
        MemStore {
            records: DashMap::new(),
            logger: Some(logger),
        }
    }

    /// Snapshot of every stored value, in no particular order
    pub fn values(&self) -> Vec<V> {
        self.records.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Snapshot of every stored key, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }
}

impl<V: Clone + Send + Sync> Default for MemStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Storage<V> for MemStore<V> {
    fn insert(&self, key: String, value: V) {
        if let Some(logger) = &self.logger {
            log_info!(logger, "Value has been inserted to in-memory store with key: ", key);
        }
        self.records.insert(key, value);
    }

    fn read(&self, key: &str) -> Option<V> {
        self.records.get(key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

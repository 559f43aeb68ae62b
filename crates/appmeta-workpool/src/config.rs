use crate::{DispatchMode, PoolError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool sizing, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker tasks, and the registry capacity
    pub max_workers: usize,
    /// Work items buffered before `submit` starts waiting
    pub queue_capacity: usize,
    pub dispatch_mode: DispatchMode,
    /// Upper bound on concurrently pending hand-off tasks in racing mode
    pub max_pending_handoffs: usize,
    /// Deadline for the whole shutdown drain
    pub shutdown_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_workers: 3,
            queue_capacity: 20,
            dispatch_mode: DispatchMode::Racing,
            max_pending_handoffs: 64,
            shutdown_timeout_secs: 30,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(PoolError::InvalidConfig("max_workers must be at least 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(PoolError::InvalidConfig("queue_capacity must be at least 1".to_string()));
        }
        if self.max_pending_handoffs == 0 {
            return Err(PoolError::InvalidConfig(
                "max_pending_handoffs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

use crate::WorkId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Work queue is closed")]
    QueueClosed,

    #[error("Work {0} was lost before it completed")]
    Lost(WorkId),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;

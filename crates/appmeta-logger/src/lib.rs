//! Asynchronous, level-partitioned logger.
//!
//! Every level owns a bounded mailbox. Callers enqueue without blocking and a
//! single consumer task renders records to a [`LogSink`]. A FATAL record ends
//! the consumer and triggers the configured [`FatalAction`].

mod level;
mod logger;
mod record;
mod sink;

pub use level::{Level, ParseLevelError};
pub use logger::{AsyncLogger, FatalAction, LoggerBuilder, LoggerConfig};
pub use record::LogRecord;
pub use sink::{LogSink, MemorySink, StdioSink, Stream};

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    #[error("Logger has been stopped")]
    Stopped,

    #[error("{0} mailbox is full, record dropped")]
    MailboxFull(Level),
}

pub type Result<T> = std::result::Result<T, LogError>;

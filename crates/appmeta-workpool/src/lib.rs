//! Concurrent work-dispatch engine.
//!
//! Producers submit [`WorkItem`]s to a bounded [`WorkQueue`]. A single
//! dispatcher removes them in FIFO order and pairs each with the handle of an
//! idle worker taken from the registry. Workers store the payload through the
//! [`Storage`](appmeta_store::Storage) collaborator and park a fresh handle.
//!
//! ```text
//! submit ──▶ WorkQueue ──▶ Dispatcher ──▶ hand-off ──▶ Worker ──▶ Storage
//!                                            ▲            │
//!                                            └─ Registry ◀┘
//! ```

mod config;
mod dispatcher;
mod error;
mod pool;
mod queue;
mod registry;
mod work_item;
mod worker;

pub use config::PoolConfig;
pub use dispatcher::DispatchMode;
pub use error::{PoolError, Result};
pub use pool::{ShutdownReport, WorkPool};
pub use queue::{Completion, Job, QueueReceiver, Receipt, WorkQueue};
pub use registry::{Registry, WorkerHandle};
pub use work_item::{WorkId, WorkItem};
pub use worker::WorkerId;

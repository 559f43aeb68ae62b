//! HTTP surface of the application metadata service.
//!
//! Submissions are validated on the request path and handed to the work pool;
//! searches read the store directly.

pub mod api;
pub mod config;
mod context;
mod error;
mod metrics;
mod server;

pub use config::{HttpConfig, LoggingConfig, ServerConfig};
pub use context::AppContext;
pub use error::{Result, ServerError};
pub use metrics::ServerMetrics;
pub use server::Server;

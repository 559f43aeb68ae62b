mod middleware;
pub mod rest;

pub use rest::{router, ApiError, CreateAppResponse, HealthResponse};

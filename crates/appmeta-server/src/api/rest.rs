use super::middleware::{with_log, with_validation};
use crate::metrics::{OUTCOME_ACCEPTED, OUTCOME_UNAVAILABLE};
use crate::AppContext;
use appmeta_core::Metadata;
use appmeta_logger::{log_error, log_info};
use appmeta_store::{search, SearchParams, Storage};
use appmeta_workpool::WorkItem;
use axum::{
    extract::{Query, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use uuid::Uuid;

/// REST API routes
pub fn router(ctx: AppContext, max_body_bytes: usize) -> Router {
    let apps = post(create_app)
        .layer(middleware::from_fn_with_state(ctx.clone(), with_validation))
        .get(search_apps)
        .layer(middleware::from_fn_with_state(ctx.clone(), with_log));

    Router::new()
        .route("/api/v1/apps", apps)
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAppResponse {
    pub id: Uuid,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub idle_workers: usize,
    pub stored_records: usize,
}

/// Queue a validated record for storage.
///
/// Waits while the work queue is full, so a saturated pool slows clients
/// down instead of dropping their records.
async fn create_app(
    State(ctx): State<AppContext>,
    Extension(metadata): Extension<Metadata>,
) -> Result<(StatusCode, Json<CreateAppResponse>), ApiError> {
    let item = WorkItem::new(metadata);
    let response = CreateAppResponse {
        id: item.id(),
        version: item.payload().version.clone(),
    };

    if let Err(e) = ctx.queue.submit(item).await {
        log_error!(ctx.logger, "Work ", response.id, " rejected: ", e);
        ctx.metrics.record_submission(OUTCOME_UNAVAILABLE);
        return Err(ApiError::Unavailable(e.to_string()));
    }

    log_info!(ctx.logger, "Work ", response.id, " has been put on the work queue");
    ctx.metrics.record_submission(OUTCOME_ACCEPTED);
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Records matching the query parameters; all records without any.
///
/// YAML unless the client asks for JSON.
async fn search_apps(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let params = SearchParams::from_pairs(pairs);
    let results = search(&ctx.storage, &params);
    ctx.metrics.searches_total.inc();

    let wants_json = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false);

    if wants_json {
        log_info!(ctx.logger, "<-- application/json has been requested by client");
        return Ok(Json(results).into_response());
    }

    let body = serde_yaml::to_string(&results).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(CONTENT_TYPE, "application/yaml")], body).into_response())
}

async fn health_check(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        idle_workers: ctx.workers.idle(),
        stored_records: ctx.storage.len(),
    })
}

async fn metrics(State(ctx): State<AppContext>) -> Result<String, ApiError> {
    ctx.metrics.stored_records.set(ctx.storage.len() as i64);
    ctx.metrics.gather().map_err(|e| ApiError::Internal(e.to_string()))
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

use super::rest::ApiError;
use crate::metrics::OUTCOME_INVALID;
use crate::AppContext;
use appmeta_core::{validate, Metadata};
use appmeta_logger::{log_error, log_info};
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header::ACCEPT,
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use std::error::Error as _;

/// Log the method, Accept header, path and raw query of each request
pub async fn with_log(State(ctx): State<AppContext>, request: Request, next: Next) -> Response {
    let accept = request
        .headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    log_info!(ctx.logger, "<-- ", request.method());
    log_info!(ctx.logger, "<-- ", accept);
    log_info!(ctx.logger, "<-- ", request.uri().path());
    log_info!(ctx.logger, "<-- ", request.uri().query().unwrap_or_default());

    next.run(request).await
}

/// Parse and validate the metadata body.
///
/// A valid record is handed to the next handler as a request extension;
/// anything else is answered with 400 here.
pub async fn with_validation(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) if exceeds_limit(&e) => {
            log_error!(ctx.logger, "Request body exceeds the size limit");
            return Err(ApiError::PayloadTooLarge(e.to_string()));
        }
        Err(e) => return Err(ApiError::BadRequest(format!("Cannot read request body: {}", e))),
    };
    let text = String::from_utf8_lossy(&bytes);
    log_info!(ctx.logger, "Request body --> ", text);

    let metadata = Metadata::from_yaml(&text).and_then(|metadata| {
        validate(&metadata)?;
        Ok(metadata)
    });

    match metadata {
        Ok(metadata) => {
            let mut request = Request::from_parts(parts, Body::empty());
            request.extensions_mut().insert(metadata);
            Ok(next.run(request).await)
        }
        Err(e) => {
            log_error!(ctx.logger, "Request is not valid - ", e);
            ctx.metrics.record_submission(OUTCOME_INVALID);
            Err(ApiError::BadRequest(format!("Request is not valid - {}", e)))
        }
    }
}

/// Whether reading the body failed on the body size limit. Bodies without a
/// Content-Length only hit the limit while being read.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

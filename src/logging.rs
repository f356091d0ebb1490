use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Per-request logging with a generated request id.
///
/// Status classes map to log levels so that 5xx responses stand out in
/// aggregated output without any extra filtering.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        error!(%request_id, %method, %path, %status, latency_ms, "request failed");
    } else if status.is_client_error() {
        warn!(%request_id, %method, %path, %status, latency_ms, "request rejected");
    } else {
        info!(%request_id, %method, %path, %status, latency_ms, "request completed");
    }

    response
}

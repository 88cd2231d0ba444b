//! REST surface of the solver service.

use std::time::Instant;

use axum::{
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::SolverRequest;
use crate::dto::SolveResponse;
use crate::engine;
use crate::error::SolveError;
use crate::logging::{log_event, Level};

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/solve", post(solve))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    log_event(Level::Info, "health.check", &[]);
    Json(HealthResponse { status: "ok" })
}

/// POST /solve
///
/// The solve itself is synchronous and CPU-bound, so it runs on the blocking
/// pool; the request id from `X-Request-Id` (or a generated one) threads
/// through every log line it emits.
async fn solve(
    headers: HeaderMap,
    Json(payload): Json<SolverRequest>,
) -> Result<Json<SolveResponse>, SolveError> {
    let request_id = request_id_from_headers(&headers);
    let started_at = Instant::now();
    let response = tokio::task::spawn_blocking(move || {
        engine::solve_schedule_request(&payload, &request_id, started_at)
    })
    .await
    .map_err(|join_error| SolveError::Internal(join_error.to_string()))??;
    Ok(Json(response))
}

pub fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let mut id = Uuid::new_v4().simple().to_string();
            id.truncate(8);
            id
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn request_id_prefers_the_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
        assert_eq!(request_id_from_headers(&headers), "abc-123");
    }

    #[test]
    fn request_id_is_generated_when_missing() {
        let id = request_id_from_headers(&HeaderMap::new());
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

//! Error taxonomy for the solve pipeline.
//!
//! Input rejection surfaces as HTTP 422 with a `{"detail": …}` body;
//! infeasibility is not an error and travels inside the 200 response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum SolveError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Solve failed: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SolveError>;

impl IntoResponse for SolveError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            SolveError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SolveError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

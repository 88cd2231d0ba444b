//! API-facing gateway: request forwarding to the solver service, the
//! schedule snapshot endpoints, and demo data.
//!
//! Solver communication is centralized in [`forward_to_solver`] so timeouts,
//! error mapping, and request-id propagation stay consistent.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::api::HealthResponse;
use crate::config::GatewayConfig;
use crate::demo_data::{self, DemoData};
use crate::domain::SolverRequest;
use crate::logging::{log_event, Level};
use crate::state::{SnapshotStore, SCHEDULE_STATE_KEY};

pub struct GatewayState {
    pub config: GatewayConfig,
    pub store: SnapshotStore,
    pub client: reqwest::Client,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            store: SnapshotStore::new(),
            client: reqwest::Client::new(),
        }
    }
}

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/solve/schedule", post(solve_schedule))
        .route("/state/schedule", get(get_schedule_state))
        .route("/state/schedule", put(put_schedule_state))
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        .with_state(state)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    log_event(Level::Info, "health.check", &[]);
    Json(HealthResponse { status: "ok" })
}

/// POST /solve/schedule - forwards the payload verbatim to the solver.
async fn solve_schedule(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("n/a")
        .to_string();
    forward_to_solver(&state, "/solve", payload, request_id).await
}

async fn forward_to_solver(
    state: &GatewayState,
    path: &str,
    payload: Value,
    request_id: String,
) -> Response {
    let started_at = Instant::now();
    log_event(
        Level::Info,
        "solver_proxy.forward.start",
        &[
            ("request_id", json!(request_id)),
            ("path", json!(path)),
            (
                "timeout_seconds",
                json!(state.config.forward_timeout.as_secs_f64()),
            ),
        ],
    );

    let sent = state
        .client
        .post(format!("{}{}", state.config.solver_url, path))
        .json(&payload)
        .header("X-Request-Id", &request_id)
        .timeout(state.config.forward_timeout)
        .send()
        .await;

    let response = match sent {
        Ok(response) => response,
        Err(error) => {
            log_event(
                Level::Error,
                "solver_proxy.forward.error",
                &[
                    ("request_id", json!(request_id)),
                    ("path", json!(path)),
                    ("elapsed_us", json!(started_at.elapsed().as_micros() as u64)),
                    ("error", json!(error.to_string())),
                ],
            );
            return solver_unavailable(&error);
        }
    };

    let status_code = response.status().as_u16();
    if !response.status().is_success() {
        let detail = match response.text().await {
            Ok(text) if !text.is_empty() => text,
            _ => "Solver rejected request.".to_string(),
        };
        log_event(
            Level::Warn,
            "solver_proxy.forward.rejected",
            &[
                ("request_id", json!(request_id)),
                ("path", json!(path)),
                ("status_code", json!(status_code)),
                ("elapsed_us", json!(started_at.elapsed().as_micros() as u64)),
                ("detail", json!(detail)),
            ],
        );
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY);
        return (status, Json(json!({ "detail": detail }))).into_response();
    }

    match response.json::<Value>().await {
        Ok(body) => {
            log_event(
                Level::Info,
                "solver_proxy.forward.done",
                &[
                    ("request_id", json!(request_id)),
                    ("path", json!(path)),
                    ("status_code", json!(status_code)),
                    ("elapsed_us", json!(started_at.elapsed().as_micros() as u64)),
                ],
            );
            Json(body).into_response()
        }
        Err(error) => {
            log_event(
                Level::Error,
                "solver_proxy.forward.error",
                &[
                    ("request_id", json!(request_id)),
                    ("path", json!(path)),
                    ("elapsed_us", json!(started_at.elapsed().as_micros() as u64)),
                    ("error", json!(error.to_string())),
                ],
            );
            solver_unavailable(&error)
        }
    }
}

fn solver_unavailable(error: &reqwest::Error) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "detail": format!("Solver unavailable: {error}") })),
    )
        .into_response()
}

/// GET /state/schedule
async fn get_schedule_state(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let snapshot = state.store.get(SCHEDULE_STATE_KEY);
    log_event(
        Level::Info,
        "state.schedule.get",
        &[("exists", json!(snapshot.is_some()))],
    );
    match snapshot {
        Some((value, updated_at)) => Json(json!({
            "exists": true,
            "state": value,
            "updated_at": updated_at.to_rfc3339(),
        })),
        None => Json(json!({ "exists": false, "state": null, "updated_at": null })),
    }
}

/// PUT /state/schedule - stores the whole UI workspace as one snapshot.
async fn put_schedule_state(
    State(state): State<Arc<GatewayState>>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let updated_at = state.store.put(SCHEDULE_STATE_KEY, payload);
    log_event(
        Level::Info,
        "state.schedule.put",
        &[("updated_at", json!(updated_at.to_rfc3339()))],
    );
    Json(json!({ "ok": true, "updated_at": updated_at.to_rfc3339() }))
}

/// GET /demo-data
async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::list_demo_data())
}

/// GET /demo-data/{id}
async fn get_demo_data(Path(id): Path<String>) -> Result<Json<SolverRequest>, StatusCode> {
    match id.parse::<DemoData>() {
        Ok(demo) => Ok(Json(demo_data::generate(demo))),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

//! API-facing gateway - Axum server.
//!
//! Run with: cargo run --bin gateway
//! Forwards /solve/schedule to the solver service (`SOLVER_URL`) and serves
//! the schedule snapshot endpoints.

use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};

use shift_scheduling::config::GatewayConfig;
use shift_scheduling::gateway::{self, GatewayState};
use shift_scheduling::logging;

#[tokio::main]
async fn main() {
    logging::init("backend");

    let config = GatewayConfig::from_env();
    let state = Arc::new(GatewayState::new(config.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = gateway::router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

//! Solver service - Axum server.
//!
//! Run with: cargo run --bin solver
//! Exposes POST /solve and GET /health.

use shift_scheduling::{api, config::SolverConfig, logging};

#[tokio::main]
async fn main() {
    logging::init("solver");

    let config = SolverConfig::from_env();
    let app = api::router();

    let listener = tokio::net::TcpListener::bind(config.bind).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

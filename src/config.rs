//! Environment-driven configuration for the two services.

use std::net::SocketAddr;
use std::time::Duration;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_addr(name: &str, default: &str) -> SocketAddr {
    let raw = env_or(name, default);
    raw.parse().unwrap_or_else(|_| {
        panic!("{name} must be a socket address like {default}, got '{raw}'")
    })
}

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub bind: SocketAddr,
}

impl SolverConfig {
    pub fn from_env() -> Self {
        Self {
            bind: parse_addr("SOLVER_BIND", "0.0.0.0:9000"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    /// Base URL of the solver service the gateway forwards to.
    pub solver_url: String,
    pub forward_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            bind: parse_addr("GATEWAY_BIND", "0.0.0.0:8000"),
            solver_url: env_or("SOLVER_URL", "http://solver:9000"),
            forward_timeout: Duration::from_secs(60),
        }
    }
}

//! Structured event lines.
//!
//! One line per event, ` | ` separated: an ISO-8601 microsecond UTC
//! timestamp, `service=`, `level=`, `event=`, then JSON-encoded key/value
//! fields. Lines are emitted through `tracing` so `RUST_LOG` filtering
//! applies; [`init`] installs a message-only formatter to keep the line
//! format intact.

use std::sync::OnceLock;

use chrono::Utc;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

static SERVICE_NAME: OnceLock<&'static str> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Installs the subscriber and fixes the `service=` tag for this process.
/// Subsequent calls only set the service name once.
pub fn init(service: &'static str) {
    let _ = SERVICE_NAME.set(service);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(false)
        .without_time()
        .try_init();
}

fn service_name() -> &'static str {
    SERVICE_NAME.get().copied().unwrap_or("solver")
}

fn serialize_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn format_log_line(level: Level, event: &str, fields: &[(&str, Value)]) -> String {
    let mut parts = vec![
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        format!("service={}", service_name()),
        format!("level={}", level.as_str()),
        format!("event={event}"),
    ];
    for (key, value) in fields {
        parts.push(format!("{key}={}", serialize_value(value)));
    }
    parts.join(" | ")
}

/// Emits one event line at the given level.
pub fn log_event(level: Level, event: &str, fields: &[(&str, Value)]) {
    let line = format_log_line(level, event, fields);
    match level {
        Level::Info => tracing::info!("{line}"),
        Level::Warn => tracing::warn!("{line}"),
        Level::Error => tracing::error!("{line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn line_carries_service_level_event_and_fields() {
        let line = format_log_line(
            Level::Warn,
            "solve.request.rejected",
            &[("request_id", json!("abc123")), ("employees", json!(0))],
        );
        let mut parts = line.split(" | ");
        let ts = parts.next().unwrap();
        assert!(ts.ends_with('Z') && ts.contains('T'));
        assert!(parts.next().unwrap().starts_with("service="));
        assert_eq!(parts.next().unwrap(), "level=WARN");
        assert_eq!(parts.next().unwrap(), "event=solve.request.rejected");
        assert_eq!(parts.next().unwrap(), r#"request_id="abc123""#);
        assert_eq!(parts.next().unwrap(), "employees=0");
    }

    #[test]
    fn values_serialize_as_json() {
        assert_eq!(serialize_value(&json!(null)), "null");
        assert_eq!(serialize_value(&json!(true)), "true");
        assert_eq!(serialize_value(&json!(1.5)), "1.5");
        assert_eq!(serialize_value(&json!("a b")), r#""a b""#);
        assert_eq!(serialize_value(&json!(["x"])), r#"["x"]"#);
    }
}

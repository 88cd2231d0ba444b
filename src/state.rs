//! Single-key JSON snapshot store.
//!
//! The UI workspace persists as one JSON document under a fixed key, which
//! avoids schema churn while the domain is still moving. The store is the
//! seam where a database-backed document store would plug in; this
//! implementation keeps the snapshot in-process.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

pub const SCHEDULE_STATE_KEY: &str = "schedule_ui_state_v1";

#[derive(Debug, Clone)]
struct Snapshot {
    state: Value,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: RwLock<HashMap<String, Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<(Value, DateTime<Utc>)> {
        self.entries
            .read()
            .get(key)
            .map(|snapshot| (snapshot.state.clone(), snapshot.updated_at))
    }

    /// Replaces the snapshot under `key` and returns the new `updated_at`.
    pub fn put(&self, key: &str, state: Value) -> DateTime<Utc> {
        let updated_at = Utc::now();
        self.entries
            .write()
            .insert(key.to_string(), Snapshot { state, updated_at });
        updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_key_reads_as_none() {
        let store = SnapshotStore::new();
        assert!(store.get(SCHEDULE_STATE_KEY).is_none());
    }

    #[test]
    fn put_then_get_round_trips_and_advances_updated_at() {
        let store = SnapshotStore::new();
        let first = store.put(SCHEDULE_STATE_KEY, json!({"rev": 1}));
        let (state, updated_at) = store.get(SCHEDULE_STATE_KEY).unwrap();
        assert_eq!(state, json!({"rev": 1}));
        assert_eq!(updated_at, first);

        let second = store.put(SCHEDULE_STATE_KEY, json!({"rev": 2}));
        let (state, updated_at) = store.get(SCHEDULE_STATE_KEY).unwrap();
        assert_eq!(state, json!({"rev": 2}));
        assert_eq!(updated_at, second);
        assert!(second >= first);
    }
}

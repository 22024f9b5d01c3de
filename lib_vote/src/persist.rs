//! # Persistence Bridge
//!
//! Serializes the durable subset of the store (theme, votes, scores) into a
//! single storage key and reads it back at startup. Items, request flags and
//! the notification are never written.
//!
//! Stored envelope:
//!
//! ```json
//! {"state": {"theme": "dark", "userVotes": {"a": 1}, "scores": {"a": 3}}, "version": 0}
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::model::{Direction, Theme};
use crate::storage::KeyValueStorage;

/// Storage key of the persisted snapshot.
pub const STORE_KEY: &str = "cat-voting-storage";

const SNAPSHOT_VERSION: u32 = 0;

/// The durable part of the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Theme preference.
    #[serde(default)]
    pub theme: Theme,
    /// Item id to the direction the user voted.
    #[serde(default)]
    pub user_votes: BTreeMap<String, Direction>,
    /// Item id to accumulated score.
    #[serde(default)]
    pub scores: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

/// Reads and writes `PersistedState` through a `KeyValueStorage`.
pub struct PersistenceBridge {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl PersistenceBridge {
    /// Bridge over `storage` using the default key.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, STORE_KEY)
    }

    /// Bridge over `storage` using `key`.
    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Reads the last snapshot. `Ok(None)` when nothing was stored yet.
    pub fn read(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let Some(raw) = self.storage.get(&self.key).map_err(PersistenceError::Read)? else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_str(&raw)?;
        if envelope.version != SNAPSHOT_VERSION {
            tracing::debug!(version = envelope.version, "Reading snapshot from another version");
        }
        Ok(Some(envelope.state))
    }

    /// Startup rehydration. Absent or unreadable snapshots yield defaults.
    pub fn load(&self) -> PersistedState {
        match self.read() {
            Ok(Some(state)) => {
                tracing::debug!(
                    votes = state.user_votes.len(),
                    scores = state.scores.len(),
                    "Rehydrated persisted state"
                );
                state
            }
            Ok(None) => {
                tracing::debug!("No persisted state, starting empty");
                PersistedState::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding persisted state, starting empty");
                PersistedState::default()
            }
        }
    }

    /// Writes `state` as the new snapshot.
    pub fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let envelope = Envelope {
            state: state.clone(),
            version: SNAPSHOT_VERSION,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.storage
            .set(&self.key, &raw)
            .map_err(PersistenceError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn sample() -> PersistedState {
        PersistedState {
            theme: Theme::Dark,
            user_votes: BTreeMap::from([
                ("a".to_string(), Direction::Up),
                ("b".to_string(), Direction::Down),
            ]),
            scores: BTreeMap::from([("a".to_string(), 3), ("b".to_string(), -2)]),
        }
    }

    #[test]
    fn save_writes_the_documented_envelope() {
        let storage = Arc::new(MemoryStorage::new());
        let bridge = PersistenceBridge::new(storage.clone());
        bridge.save(&sample()).unwrap();

        let raw = storage.get(STORE_KEY).unwrap().unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "state": {
                    "theme": "dark",
                    "userVotes": {"a": 1, "b": -1},
                    "scores": {"a": 3, "b": -2}
                },
                "version": 0
            })
        );
        assert_eq!(bridge.load(), sample());
    }

    #[test]
    fn absent_snapshot_loads_defaults() {
        let bridge = PersistenceBridge::new(Arc::new(MemoryStorage::new()));
        assert_eq!(bridge.read().unwrap(), None);
        assert_eq!(bridge.load(), PersistedState::default());
    }

    #[test]
    fn malformed_snapshot_loads_defaults() {
        for raw in ["not json", "{\"state\": 5}", "{\"state\":{\"userVotes\":{\"a\":7}}}"] {
            let bridge = PersistenceBridge::new(Arc::new(MemoryStorage::with_entry(STORE_KEY, raw)));
            assert!(matches!(bridge.read(), Err(PersistenceError::Malformed(_))), "{}", raw);
            assert_eq!(bridge.load(), PersistedState::default());
        }
    }

    #[test]
    fn missing_fields_default_individually() {
        let raw = r#"{"state":{"userVotes":{"x":-1}}}"#;
        let bridge = PersistenceBridge::new(Arc::new(MemoryStorage::with_entry(STORE_KEY, raw)));
        let state = bridge.load();
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(state.user_votes.get("x"), Some(&Direction::Down));
        assert!(state.scores.is_empty());
    }

    #[test]
    fn write_failure_is_reported() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_reject_writes(true);
        let bridge = PersistenceBridge::new(storage);
        assert!(matches!(bridge.save(&sample()), Err(PersistenceError::Write(_))));
    }
}

//! Session snapshots: the durable form of the history stack, written and
//! read via the Atomic Writer (design §4.6, §6 on-disk schema).

use std::path::Path;

use chrono::{DateTime, Utc};
use fastanime_core::atomic::atomic_write_json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SessionResult;
use crate::state::State;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub created_at: DateTime<Utc>,
    pub last_saved: DateTime<Utc>,
    pub session_name: Option<String>,
    pub description: Option<String>,
    pub state_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub format_version: String,
    pub metadata: SessionMetadata,
    pub history: Vec<State>,
}

impl SessionData {
    /// Builds a snapshot from a live history stack (last element current).
    pub fn from_history(history: Vec<State>, name: Option<String>, created_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            format_version: FORMAT_VERSION.to_string(),
            metadata: SessionMetadata {
                created_at,
                last_saved: now,
                session_name: name,
                description: None,
                state_count: history.len(),
            },
            history,
        }
    }

    pub fn save(&self, path: &Path) -> SessionResult<()> {
        atomic_write_json(path, self)?;
        Ok(())
    }

    /// Loads a snapshot, logging (not failing on) any unrecognized
    /// top-level key, per design §4.6.
    pub fn load(path: &Path) -> SessionResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| fastanime_core::error::CoreError::io(path, e))?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        if let Some(obj) = value.as_object() {
            const KNOWN: [&str; 3] = ["format_version", "metadata", "history"];
            for key in obj.keys() {
                if !KNOWN.contains(&key.as_str()) {
                    warn!(path = %path.display(), key, "ignoring unrecognized top-level key in session snapshot");
                }
            }
        }
        let data: SessionData = serde_json::from_value(value)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    /// Invariant 5: session round-trip (modulo last_saved).
    #[test]
    fn save_then_load_round_trips_invariant_5() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto_save.json");
        let data = SessionData::from_history(vec![State::main()], None, Utc::now());
        data.save(&path).unwrap();

        let loaded = SessionData::load(&path).unwrap();
        assert_eq!(loaded.history, data.history);
        assert_eq!(loaded.metadata.created_at, data.metadata.created_at);
        assert_eq!(loaded.format_version, data.format_version);
    }

    #[test]
    fn unrecognized_top_level_key_does_not_fail_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(
            &path,
            r#"{"format_version":"1.0","metadata":{"created_at":"2024-01-01T00:00:00Z","last_saved":"2024-01-01T00:00:00Z","session_name":null,"description":null,"state_count":1},"history":[{"menu_tag":"main"}],"from_the_future":true}"#,
        )
        .unwrap();

        let loaded = SessionData::load(&path).unwrap();
        assert_eq!(loaded.history.len(), 1);
    }
}

//! Legacy watch-history migration (design open question, resolved in
//! SPEC_FULL §9.2): the upstream project has two generations of on-disk
//! state — a flat `watch_history.json` and the current unified registry.
//! On startup, if the registry is empty and a legacy file exists, its
//! entries are migrated into fresh [`MediaRecord`]s (watched episodes
//! only; the legacy format predates download tracking). The legacy file
//! is renamed with a `.migrated` suffix afterwards, never deleted.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use fastanime_core::media::{MediaItem, MediaStatus, MediaTitle};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::models::{MediaRecord, WatchStatus};
use crate::store::RegistryStore;

pub const LEGACY_FILE_NAME: &str = "watch_history.json";

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    media_id: i64,
    title: String,
    episode_count: Option<u32>,
    watched_episodes: Vec<u32>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Default)]
struct LegacyWatchHistory {
    #[serde(default)]
    entries: BTreeMap<String, LegacyEntry>,
}

/// Runs the migration if applicable. Returns the number of records
/// migrated (`0` if there was nothing to do).
pub fn migrate_if_applicable(store: &RegistryStore, data_dir: &Path) -> RegistryResult<usize> {
    let legacy_path = data_dir.join(LEGACY_FILE_NAME);
    if !legacy_path.exists() {
        return Ok(0);
    }

    let registry_is_empty = store.list(Default::default())?.is_empty();
    if !registry_is_empty {
        warn!(
            path = %legacy_path.display(),
            "legacy watch history found but registry is non-empty; leaving it untouched"
        );
        return Ok(0);
    }

    let raw = std::fs::read_to_string(&legacy_path).map_err(|e| RegistryError::io(&legacy_path, e))?;
    let legacy: LegacyWatchHistory = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "legacy watch history is unparsable, leaving it in place");
            return Ok(0);
        }
    };

    let mut migrated = 0;
    for entry in legacy.entries.into_values() {
        let mut record = MediaRecord::new(MediaItem {
            id: entry.media_id,
            title: MediaTitle {
                english: Some(entry.title),
                romaji: None,
                native: None,
            },
            status: MediaStatus::Releasing,
            episode_count: entry.episode_count,
            cover_image: None,
        });
        record.user_data.last_updated = entry.last_updated.unwrap_or_else(Utc::now);
        for episode_number in entry.watched_episodes {
            if episode_number == 0 {
                continue;
            }
            let episode = record.episode_mut(episode_number)?;
            episode.watch_status = WatchStatus::Completed;
            episode.watch_progress = 1.0;
        }
        record.reconcile_user_status();
        store.save(record)?;
        migrated += 1;
    }

    let migrated_path = legacy_path.with_extension("json.migrated");
    std::fs::rename(&legacy_path, &migrated_path).map_err(|e| RegistryError::io(&legacy_path, e))?;
    info!(count = migrated, "migrated legacy watch history");
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_watched_episodes_from_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let legacy_path = dir.path().join(LEGACY_FILE_NAME);
        std::fs::write(
            &legacy_path,
            r#"{"entries": {"100": {"media_id": 100, "title": "Sample", "episode_count": 12, "watched_episodes": [1, 2, 3]}}}"#,
        )
        .unwrap();

        let store = RegistryStore::open(dir.path()).unwrap();
        let migrated = migrate_if_applicable(&store, dir.path()).unwrap();
        assert_eq!(migrated, 1);

        let record = store.get(100).unwrap().unwrap();
        assert_eq!(record.total_episodes_watched(), 3);
        assert!(!legacy_path.exists());
        assert!(dir.path().join("watch_history.json.migrated").exists());
    }

    #[test]
    fn skips_migration_when_registry_already_populated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LEGACY_FILE_NAME),
            r#"{"entries": {}}"#,
        )
        .unwrap();

        let store = RegistryStore::open(dir.path()).unwrap();
        store
            .save(MediaRecord::new(MediaItem {
                id: 1,
                title: MediaTitle::default(),
                status: MediaStatus::Releasing,
                episode_count: None,
                cover_image: None,
            }))
            .unwrap();

        let migrated = migrate_if_applicable(&store, dir.path()).unwrap();
        assert_eq!(migrated, 0);
        assert!(dir.path().join(LEGACY_FILE_NAME).exists());
    }
}

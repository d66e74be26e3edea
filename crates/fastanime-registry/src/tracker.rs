//! Registry Tracker (design §4.3): a thin façade translating external
//! playback/download events into the §4.2.1 update rules, logging and
//! swallowing failures rather than propagating them — ported from
//! `fastanime/cli/services/registry/tracker.py`, which returns a bare
//! `bool` for the same reason (callers are UI event handlers that show a
//! toast, not propagate a typed error).

use std::path::PathBuf;

use chrono::Utc;
use tracing::error;

use crate::models::MediaRecord;
use crate::store::RegistryStore;

pub struct RegistryTracker<'a> {
    store: &'a RegistryStore,
}

impl<'a> RegistryTracker<'a> {
    pub fn new(store: &'a RegistryStore) -> Self {
        Self { store }
    }

    /// Design §4.2.1, playback branch. `stop_time`/`total_time` are
    /// `"HH:MM:SS"`.
    pub fn record_playback(
        &self,
        media_id: i64,
        episode_number: u32,
        stop_time: &str,
        total_time: &str,
    ) -> bool {
        self.try_record_playback(media_id, episode_number, stop_time, total_time)
            .map_err(|e| error!(media_id, episode_number, error = %e, "failed to record playback"))
            .is_ok()
    }

    fn try_record_playback(
        &self,
        media_id: i64,
        episode_number: u32,
        stop_time: &str,
        total_time: &str,
    ) -> Result<(), crate::error::RegistryError> {
        let mut record = self.load_or_error(media_id)?;
        let now = Utc::now();
        record
            .episode_mut(episode_number)?
            .apply_playback_event(stop_time, total_time, now);
        record.reconcile_user_status();
        self.store.save(record)?;
        Ok(())
    }

    /// Design §4.2.1, download branch.
    #[allow(clippy::too_many_arguments)]
    pub fn record_download_completion(
        &self,
        media_id: i64,
        episode_number: u32,
        file_path: PathBuf,
        file_size: u64,
        quality: String,
        checksum: Option<String>,
    ) -> bool {
        self.try_record_download_completion(media_id, episode_number, file_path, file_size, quality, checksum)
            .map_err(|e| error!(media_id, episode_number, error = %e, "failed to record download completion"))
            .is_ok()
    }

    fn try_record_download_completion(
        &self,
        media_id: i64,
        episode_number: u32,
        file_path: PathBuf,
        file_size: u64,
        quality: String,
        checksum: Option<String>,
    ) -> Result<(), crate::error::RegistryError> {
        let mut record = self.load_or_error(media_id)?;
        let now = Utc::now();
        let auto_mark = record.user_data.auto_mark_watched_on_download;
        record
            .episode_mut(episode_number)?
            .apply_download_completion(file_path, file_size, quality, checksum, now, auto_mark);
        self.store.save(record)?;
        Ok(())
    }

    /// Returns the record's `next_episode_to_watch` only if it is also
    /// present in `available` — the set of episode numbers the caller has
    /// actually confirmed exist upstream.
    pub fn continue_episode(&self, media_id: i64, available: &[u32]) -> Option<u32> {
        let record = self.store.get(media_id).ok().flatten()?;
        let next = record.next_episode_to_watch()?;
        available.contains(&next).then_some(next)
    }

    fn load_or_error(&self, media_id: i64) -> Result<MediaRecord, crate::error::RegistryError> {
        self.store
            .get(media_id)?
            .ok_or(crate::error::RegistryError::NotFound(media_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastanime_core::media::{MediaItem, MediaStatus, MediaTitle};

    fn item(id: i64, episode_count: Option<u32>) -> MediaItem {
        MediaItem {
            id,
            title: MediaTitle {
                english: Some("T".into()),
                romaji: None,
                native: None,
            },
            status: MediaStatus::Releasing,
            episode_count,
            cover_image: None,
        }
    }

    #[test]
    fn record_playback_updates_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        store.save(MediaRecord::new(item(100, Some(12)))).unwrap();

        let tracker = RegistryTracker::new(&store);
        assert!(tracker.record_playback(100, 3, "00:21:00", "00:23:20"));

        let record = store.get(100).unwrap().unwrap();
        assert_eq!(record.next_episode_to_watch(), Some(4));
    }

    #[test]
    fn record_playback_fails_gracefully_for_unknown_media() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        let tracker = RegistryTracker::new(&store);
        assert!(!tracker.record_playback(999, 1, "00:01:00", "00:02:00"));
    }

    #[test]
    fn continue_episode_respects_available_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        store.save(MediaRecord::new(item(200, Some(12)))).unwrap();
        let tracker = RegistryTracker::new(&store);

        assert_eq!(tracker.continue_episode(200, &[2, 3]), None); // next is 1, not available
        assert_eq!(tracker.continue_episode(200, &[1, 2]), Some(1));
    }
}

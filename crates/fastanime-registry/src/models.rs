//! Data model for the unified media registry (design §3), ported field-exact
//! from `fastanime/cli/services/registry/models.py` into plain
//! `serde`-derived structs plus inherent methods instead of pydantic
//! computed fields.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fastanime_core::media::MediaItem;
use fastanime_core::time::parse_hhmmss;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    #[default]
    NotDownloaded,
    Queued,
    Downloading,
    Completed,
    Failed,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    NotWatched,
    Watching,
    Completed,
    Dropped,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaUserStatus {
    #[default]
    Planning,
    Watching,
    Completed,
    Dropped,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeStatus {
    pub download_status: DownloadStatus,
    pub file_path: Option<PathBuf>,
    pub file_size: Option<u64>,
    pub download_date: Option<DateTime<Utc>>,
    pub download_quality: Option<String>,
    pub checksum: Option<String>,

    pub watch_status: WatchStatus,
    pub watch_progress: f64,
    pub last_watch_position: Option<String>,
    pub total_duration: Option<String>,
    pub watch_date: Option<DateTime<Utc>>,
    pub watch_count: u32,

    pub auto_marked_watched: bool,
}

impl Default for EpisodeStatus {
    fn default() -> Self {
        Self {
            download_status: DownloadStatus::default(),
            file_path: None,
            file_size: None,
            download_date: None,
            download_quality: None,
            checksum: None,
            watch_status: WatchStatus::default(),
            watch_progress: 0.0,
            last_watch_position: None,
            total_duration: None,
            watch_date: None,
            watch_count: 0,
            auto_marked_watched: false,
        }
    }
}

impl EpisodeStatus {
    /// `download_status == completed` and the file is actually present.
    pub fn is_available_locally(&self) -> bool {
        self.download_status == DownloadStatus::Completed
            && self
                .file_path
                .as_ref()
                .is_some_and(|p| p.exists())
    }

    /// Completion derived from player timestamps when both are present,
    /// else falls back to `watch_progress * 100`.
    pub fn completion_percentage(&self) -> f64 {
        if let (Some(pos), Some(total)) = (&self.last_watch_position, &self.total_duration) {
            if let (Some(last), Some(total)) = (parse_hhmmss(pos), parse_hhmmss(total)) {
                if total > 0 {
                    return ((last as f64 / total as f64) * 100.0).min(100.0);
                }
            }
        }
        self.watch_progress * 100.0
    }

    pub fn should_auto_mark_watched(&self) -> bool {
        self.completion_percentage() >= 80.0 && self.watch_status != WatchStatus::Completed
    }

    /// Applies a playback event per design §4.2.1 steps 1-2. Status
    /// transitions that depend on the owning record (steps 3-4) are
    /// applied by [`super::store::RegistryStore`], which has the full
    /// record in hand.
    pub fn apply_playback_event(&mut self, stop_time: &str, total_time: &str, now: DateTime<Utc>) {
        self.last_watch_position = Some(stop_time.to_string());
        self.total_duration = Some(total_time.to_string());
        self.watch_date = Some(now);
        self.watch_count += 1;

        if self.should_auto_mark_watched() {
            self.watch_status = WatchStatus::Completed;
            self.watch_progress = 1.0;
        }
    }

    pub fn apply_download_completion(
        &mut self,
        file_path: PathBuf,
        file_size: u64,
        quality: String,
        checksum: Option<String>,
        now: DateTime<Utc>,
        auto_mark_watched_on_download: bool,
    ) {
        self.download_status = DownloadStatus::Completed;
        self.file_path = Some(file_path);
        self.file_size = Some(file_size);
        self.download_quality = Some(quality);
        self.checksum = checksum;
        self.download_date = Some(now);

        if auto_mark_watched_on_download && self.watch_status == WatchStatus::NotWatched {
            self.watch_status = WatchStatus::Completed;
            self.watch_progress = 1.0;
            self.auto_marked_watched = true;
            self.watch_date = Some(now);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMediaData {
    pub status: MediaUserStatus,
    pub notes: String,
    pub tags: Vec<String>,
    pub rating: Option<u8>,
    pub favorite: bool,
    pub priority: u32,

    pub preferred_quality: String,
    pub auto_download_new: bool,
    pub download_path: Option<PathBuf>,

    pub continue_from_history: bool,
    pub auto_mark_watched_on_download: bool,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Default for UserMediaData {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            status: MediaUserStatus::default(),
            notes: String::new(),
            tags: Vec::new(),
            rating: None,
            favorite: false,
            priority: 0,
            preferred_quality: "1080".into(),
            auto_download_new: false,
            download_path: None,
            continue_from_history: true,
            auto_mark_watched_on_download: false,
            created_at: now,
            last_updated: now,
        }
    }
}

impl UserMediaData {
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub media_item: MediaItem,
    pub episodes: BTreeMap<u32, EpisodeStatus>,
    pub user_data: UserMediaData,
}

impl MediaRecord {
    pub fn new(media_item: MediaItem) -> Self {
        Self {
            media_item,
            episodes: BTreeMap::new(),
            user_data: UserMediaData::default(),
        }
    }

    pub fn display_title(&self) -> String {
        self.media_item.display_title()
    }

    pub fn total_episodes_downloaded(&self) -> u32 {
        self.episodes
            .values()
            .filter(|e| e.is_available_locally())
            .count() as u32
    }

    pub fn total_episodes_watched(&self) -> u32 {
        self.episodes
            .values()
            .filter(|e| e.watch_status == WatchStatus::Completed)
            .count() as u32
    }

    pub fn last_watched_episode(&self) -> Option<u32> {
        self.episodes
            .iter()
            .filter(|(_, e)| e.watch_status == WatchStatus::Completed)
            .map(|(n, _)| *n)
            .max()
    }

    /// Design §4.2.2: the next unwatched episode, or `None` if the known
    /// episode count has already been reached.
    pub fn next_episode_to_watch(&self) -> Option<u32> {
        let next = match self.last_watched_episode() {
            Some(m) => m + 1,
            None => 1,
        };
        if let Some(total) = self.media_item.episode_count {
            if next > total {
                return None;
            }
        }
        Some(next)
    }

    /// Episode keys must be strictly positive and unique — enforced by the
    /// `BTreeMap<u32, _>` key type plus this check at insertion time.
    pub fn episode_mut(&mut self, number: u32) -> Result<&mut EpisodeStatus, crate::error::RegistryError> {
        if number == 0 {
            return Err(crate::error::RegistryError::Validation(
                "episode numbers must be positive".into(),
            ));
        }
        Ok(self.episodes.entry(number).or_default())
    }

    /// Applies the status-transition rules in design §4.2.1 steps 3-4,
    /// after the episode-local mutation (step 1-2) has already happened.
    pub fn reconcile_user_status(&mut self) {
        if self.user_data.status == MediaUserStatus::Planning
            && self.total_episodes_watched() > 0
        {
            self.user_data.status = MediaUserStatus::Watching;
        }
        if let Some(total) = self.media_item.episode_count {
            if self.total_episodes_watched() >= total {
                self.user_data.status = MediaUserStatus::Completed;
            }
        }
    }
}

/// Denormalized summary of a [`MediaRecord`], fully derivable from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub title: String,
    pub user_status: MediaUserStatus,
    pub episodes_downloaded: u32,
    pub episodes_watched: u32,
    pub total_episodes: Option<u32>,
    pub last_updated: DateTime<Utc>,
    pub last_watched_episode: Option<u32>,
    pub next_episode: Option<u32>,
}

impl From<&MediaRecord> for IndexEntry {
    fn from(record: &MediaRecord) -> Self {
        Self {
            title: record.display_title(),
            user_status: record.user_data.status,
            episodes_downloaded: record.total_episodes_downloaded(),
            episodes_watched: record.total_episodes_watched(),
            total_episodes: record.media_item.episode_count,
            last_updated: record.user_data.last_updated,
            last_watched_episode: record.last_watched_episode(),
            next_episode: record.next_episode_to_watch(),
        }
    }
}

pub const INDEX_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryIndex {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub media_count: usize,
    pub media_index: BTreeMap<i64, IndexEntry>,
}

impl Default for RegistryIndex {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION.to_string(),
            last_updated: Utc::now(),
            media_count: 0,
            media_index: BTreeMap::new(),
        }
    }
}

impl RegistryIndex {
    pub fn status_breakdown(&self) -> BTreeMap<MediaUserStatus, usize> {
        let mut counts: BTreeMap<MediaUserStatus, usize> = BTreeMap::new();
        for entry in self.media_index.values() {
            *counts.entry(entry.user_status).or_insert(0) += 1;
        }
        counts
    }
}

// `MediaUserStatus` needs `Ord` to live as a `BTreeMap` key in
// `status_breakdown`; derive it from the enum's declaration order.
impl PartialOrd for MediaUserStatus {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaUserStatus {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadQueueItem {
    pub media_id: i64,
    pub episode_number: u32,
    pub priority: i32,
    pub added_at: DateTime<Utc>,
    pub estimated_size: Option<u64>,
    pub quality_preference: String,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl DownloadQueueItem {
    /// Primary order: higher priority first. Secondary: earlier `added_at`
    /// first. Matches design §3's `DownloadQueueItem` ordering rule.
    pub fn ordering_key(&self) -> (i32, DateTime<Utc>) {
        (-self.priority, self.added_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastanime_core::media::{MediaStatus, MediaTitle};

    fn sample_item(episode_count: Option<u32>) -> MediaItem {
        MediaItem {
            id: 100,
            title: MediaTitle {
                english: Some("Sample".into()),
                romaji: None,
                native: None,
            },
            status: MediaStatus::Releasing,
            episode_count,
            cover_image: None,
        }
    }

    #[test]
    fn next_episode_is_one_when_nothing_watched() {
        let record = MediaRecord::new(sample_item(Some(12)));
        assert_eq!(record.next_episode_to_watch(), Some(1));
    }

    #[test]
    fn next_episode_is_absent_once_total_reached() {
        let mut record = MediaRecord::new(sample_item(Some(1)));
        record.episode_mut(1).unwrap().watch_status = WatchStatus::Completed;
        assert_eq!(record.next_episode_to_watch(), None);
    }

    #[test]
    fn next_episode_depends_only_on_completed_set_and_episode_count() {
        let mut a = MediaRecord::new(sample_item(Some(12)));
        let mut b = MediaRecord::new(sample_item(Some(12)));
        a.episode_mut(3).unwrap().watch_status = WatchStatus::Completed;
        b.episode_mut(3).unwrap().watch_status = WatchStatus::Completed;
        b.episode_mut(2).unwrap().download_status = DownloadStatus::Completed; // irrelevant field
        assert_eq!(a.next_episode_to_watch(), b.next_episode_to_watch());
    }

    #[test]
    fn completion_percentage_prefers_positions_over_progress() {
        let mut status = EpisodeStatus::default();
        status.watch_progress = 0.1;
        status.last_watch_position = Some("00:21:00".into());
        status.total_duration = Some("00:23:20".into());
        let pct = status.completion_percentage();
        assert!((pct - 90.0).abs() < 1.0, "expected ~90%, got {pct}");
    }

    #[test]
    fn playback_event_scenario_s2() {
        let mut record = MediaRecord::new(sample_item(Some(12)));
        let now = Utc::now();
        {
            let ep = record.episode_mut(3).unwrap();
            ep.apply_playback_event("00:21:00", "00:23:20", now);
        }
        record.reconcile_user_status();

        let ep = &record.episodes[&3];
        assert_eq!(ep.watch_status, WatchStatus::Completed);
        assert_eq!(ep.watch_progress, 1.0);
        assert_eq!(ep.watch_count, 1);
        assert_eq!(record.user_data.status, MediaUserStatus::Watching);
        assert_eq!(record.next_episode_to_watch(), Some(4));
    }

    #[test]
    fn download_completion_auto_marks_watched_scenario_s3() {
        let mut record = MediaRecord::new(sample_item(Some(12)));
        record.user_data.auto_mark_watched_on_download = true;
        let now = Utc::now();
        {
            let ep = record.episode_mut(1).unwrap();
            ep.apply_download_completion(
                "/v/e1.mkv".into(),
                700_000_000,
                "1080".into(),
                Some("h".into()),
                now,
                record.user_data.auto_mark_watched_on_download,
            );
        }

        let ep = &record.episodes[&1];
        assert_eq!(ep.download_status, DownloadStatus::Completed);
        assert_eq!(ep.file_path, Some(PathBuf::from("/v/e1.mkv")));
        assert_eq!(ep.watch_status, WatchStatus::Completed);
        assert!(ep.auto_marked_watched);
    }

    #[test]
    fn idempotent_download_completion_invariant_8() {
        let mut record = MediaRecord::new(sample_item(None));
        let now = Utc::now();
        let apply = |record: &mut MediaRecord| {
            let ep = record.episode_mut(1).unwrap();
            ep.apply_download_completion(
                "/v/e1.mkv".into(),
                10,
                "1080".into(),
                None,
                now,
                false,
            );
        };
        apply(&mut record);
        let first = record.episodes[&1].clone_for_test();
        apply(&mut record);
        let second = record.episodes[&1].clone_for_test();
        assert_eq!(first, second);
    }

    impl EpisodeStatus {
        fn clone_for_test(&self) -> (DownloadStatus, Option<PathBuf>, Option<u64>) {
            (self.download_status, self.file_path.clone(), self.file_size)
        }
    }
}

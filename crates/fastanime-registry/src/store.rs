//! Registry Store (design §4.2): per-media JSON records plus a derived
//! index, atomic writes, startup repair, and SHA-256 integrity
//! verification. A single reentrant lock serializes all mutations; reads
//! only take the lock long enough to clone an `Arc` out of the cache, so
//! the `MediaRecord` value itself is immutable and shared copy-on-write.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fastanime_core::atomic::atomic_write_json;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::lru::LruCache;
use crate::models::{IndexEntry, MediaRecord, MediaUserStatus, RegistryIndex};

const DEFAULT_CACHE_CAPACITY: usize = 512;

pub struct RegistryStore {
    records_dir: PathBuf,
    index_path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    cache: LruCache<MediaRecord>,
    index: RegistryIndex,
}

/// A status filter for [`RegistryStore::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub status: Option<MediaUserStatus>,
}

/// Per-episode verification outcome for §4.2.5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Ok,
    FileMissing,
    SizeMismatch,
    ChecksumMismatch,
}

impl RegistryStore {
    /// Opens (creating if absent) the registry rooted at `data_dir`, then
    /// runs startup index repair (§4.2.4) before returning.
    pub fn open(data_dir: impl AsRef<Path>) -> RegistryResult<Self> {
        let root = data_dir.as_ref().join("registry");
        let records_dir = root.join("media");
        let index_path = root.join("index.json");
        std::fs::create_dir_all(&records_dir).map_err(|e| RegistryError::io(&records_dir, e))?;

        let index = load_index(&index_path).unwrap_or_default();

        let store = Self {
            records_dir,
            index_path,
            inner: Mutex::new(Inner {
                cache: LruCache::new(DEFAULT_CACHE_CAPACITY),
                index,
            }),
        };
        store.repair_index()?;
        Ok(store)
    }

    fn record_path(&self, media_id: i64) -> PathBuf {
        self.records_dir.join(format!("{media_id}.json"))
    }

    /// Read-through get: cache hit returns immediately; miss loads,
    /// validates, and inserts into the cache.
    pub fn get(&self, media_id: i64) -> RegistryResult<Option<MediaRecord>> {
        {
            let mut inner = self.inner.lock();
            if let Some(hit) = inner.cache.get(media_id) {
                return Ok(Some((*hit).clone()));
            }
        }

        let path = self.record_path(media_id);
        if !path.exists() {
            return Ok(None);
        }

        let record = match load_record(&path) {
            Ok(record) => record,
            Err(_) => match self.repair_single_record(media_id, &path)? {
                Some(repaired) => repaired,
                None => {
                    return Err(RegistryError::CorruptRecord {
                        media_id,
                        reason: "quarantined after failed repair".into(),
                    });
                }
            },
        };

        let mut inner = self.inner.lock();
        inner.cache.insert(media_id, Arc::new(record.clone()));
        Ok(Some(record))
    }

    /// Bumps `last_updated`, atomically writes the record, rebuilds and
    /// atomically writes that one index entry, then updates the cache.
    pub fn save(&self, mut record: MediaRecord) -> RegistryResult<MediaRecord> {
        record.user_data.touch(Utc::now());
        let media_id = record.media_item.id;
        let path = self.record_path(media_id);

        atomic_write_json(&path, &record)?;

        let mut inner = self.inner.lock();
        inner
            .index
            .media_index
            .insert(media_id, IndexEntry::from(&record));
        inner.index.media_count = inner.index.media_index.len();
        inner.index.last_updated = Utc::now();
        write_index(&self.index_path, &inner.index)?;
        inner.cache.insert(media_id, Arc::new(record.clone()));

        Ok(record)
    }

    /// Iterates the index (optionally filtered), loading each match
    /// through [`Self::get`], ordered by `last_updated` descending.
    pub fn list(&self, filter: ListFilter) -> RegistryResult<Vec<MediaRecord>> {
        let mut ids: Vec<(i64, chrono::DateTime<Utc>)> = {
            let inner = self.inner.lock();
            inner
                .index
                .media_index
                .iter()
                .filter(|(_, entry)| {
                    filter
                        .status
                        .map_or(true, |status| entry.user_status == status)
                })
                .map(|(id, entry)| (*id, entry.last_updated))
                .collect()
        };
        ids.sort_by(|a, b| b.1.cmp(&a.1));

        let mut records = Vec::with_capacity(ids.len());
        for (id, _) in ids {
            if let Some(record) = self.get(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn delete(&self, media_id: i64) -> RegistryResult<()> {
        let mut inner = self.inner.lock();
        inner.cache.remove(media_id);
        let path = self.record_path(media_id);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| RegistryError::io(&path, e))?;
        }
        inner.index.media_index.remove(&media_id);
        inner.index.media_count = inner.index.media_index.len();
        inner.index.last_updated = Utc::now();
        write_index(&self.index_path, &inner.index)?;
        Ok(())
    }

    /// §4.2.3: best-effort repair of a single corrupt record. Supplies
    /// defaults for absent required fields, re-validates, and quarantines
    /// the file (renamed with a `.corrupt` suffix) if still invalid.
    /// Returns `Ok(None)` when quarantined — never silently drops data.
    fn repair_single_record(&self, media_id: i64, path: &Path) -> RegistryResult<Option<MediaRecord>> {
        let raw = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        let mut value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(_) => {
                quarantine(path)?;
                warn!(media_id, "record JSON unparsable, quarantined");
                return Ok(None);
            }
        };

        if let Some(obj) = value.as_object_mut() {
            obj.entry("episodes").or_insert_with(|| serde_json::json!({}));
            obj.entry("user_data").or_insert_with(|| {
                serde_json::to_value(crate::models::UserMediaData::default()).unwrap()
            });
        }

        match serde_json::from_value::<MediaRecord>(value) {
            Ok(record) => {
                atomic_write_json(path, &record)?;
                info!(media_id, "record repaired with defaulted fields");
                Ok(Some(record))
            }
            Err(_) => {
                quarantine(path)?;
                warn!(media_id, "record still invalid after repair, quarantined");
                Ok(None)
            }
        }
    }

    /// §4.2.4: the only registry-wide scan. Verifies every index entry's
    /// record file still exists (dropping stale entries) and re-indexes
    /// any record file missing from the index, then rewrites the index
    /// atomically.
    pub fn repair_index(&self) -> RegistryResult<()> {
        let on_disk: BTreeSet<i64> = std::fs::read_dir(&self.records_dir)
            .map_err(|e| RegistryError::io(&self.records_dir, e))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                name.strip_suffix(".json")?.parse::<i64>().ok()
            })
            .collect();

        let mut inner = self.inner.lock();
        let indexed: BTreeSet<i64> = inner.index.media_index.keys().copied().collect();

        for stale in indexed.difference(&on_disk) {
            inner.index.media_index.remove(stale);
            warn!(media_id = stale, "dropped stale index entry with no backing record");
        }

        let missing: Vec<i64> = on_disk.difference(&indexed).copied().collect();
        drop(inner);

        for media_id in missing {
            let path = self.record_path(media_id);
            match load_record(&path) {
                Ok(record) => {
                    let mut inner = self.inner.lock();
                    inner.index.media_index.insert(media_id, IndexEntry::from(&record));
                }
                Err(_) => {
                    if self.repair_single_record(media_id, &path)?.is_some() {
                        // repair rewrote the file in place; read it back for indexing.
                        if let Ok(record) = load_record(&path) {
                            let mut inner = self.inner.lock();
                            inner.index.media_index.insert(media_id, IndexEntry::from(&record));
                        }
                    }
                }
            }
        }

        let mut inner = self.inner.lock();
        inner.index.media_count = inner.index.media_index.len();
        inner.index.last_updated = Utc::now();
        write_index(&self.index_path, &inner.index)?;
        Ok(())
    }

    /// §4.2.5: for each completed episode, checks the file exists, its
    /// size matches, and (if a checksum is stored) its SHA-256 digest
    /// matches, reading in 4 KiB chunks.
    pub fn verify(&self, record: &MediaRecord) -> RegistryResult<std::collections::BTreeMap<u32, VerifyOutcome>> {
        let mut outcomes = std::collections::BTreeMap::new();
        for (number, episode) in &record.episodes {
            if episode.download_status != crate::models::DownloadStatus::Completed {
                continue;
            }
            let Some(path) = &episode.file_path else {
                outcomes.insert(*number, VerifyOutcome::FileMissing);
                continue;
            };
            if !path.exists() {
                outcomes.insert(*number, VerifyOutcome::FileMissing);
                continue;
            }
            if let Some(expected_size) = episode.file_size {
                let actual_size = std::fs::metadata(path)
                    .map_err(|e| RegistryError::io(path, e))?
                    .len();
                if actual_size != expected_size {
                    outcomes.insert(*number, VerifyOutcome::SizeMismatch);
                    continue;
                }
            }
            if let Some(expected) = &episode.checksum {
                let actual = sha256_hex(path)?;
                if &actual != expected {
                    outcomes.insert(*number, VerifyOutcome::ChecksumMismatch);
                    continue;
                }
            }
            outcomes.insert(*number, VerifyOutcome::Ok);
        }
        Ok(outcomes)
    }
}

fn sha256_hex(path: &Path) -> RegistryResult<String> {
    let mut file = std::fs::File::open(path).map_err(|e| RegistryError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = file.read(&mut buf).map_err(|e| RegistryError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn quarantine(path: &Path) -> RegistryResult<()> {
    let quarantined = path.with_extension("json.corrupt");
    std::fs::rename(path, &quarantined).map_err(|e| RegistryError::io(path, e))?;
    Ok(())
}

fn load_record(path: &Path) -> RegistryResult<MediaRecord> {
    let raw = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
    serde_json::from_str(&raw).map_err(RegistryError::from)
}

fn load_index(path: &Path) -> RegistryResult<RegistryIndex> {
    if !path.exists() {
        return Ok(RegistryIndex::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
    serde_json::from_str(&raw).map_err(RegistryError::from)
}

fn write_index(path: &Path, index: &RegistryIndex) -> RegistryResult<()> {
    atomic_write_json(path, index).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastanime_core::media::{MediaStatus, MediaTitle};

    fn item(id: i64) -> MediaItem {
        fastanime_core::media::MediaItem {
            id,
            title: MediaTitle {
                english: Some(format!("Anime {id}")),
                romaji: None,
                native: None,
            },
            status: MediaStatus::Releasing,
            episode_count: Some(12),
            cover_image: None,
        }
    }
    use fastanime_core::media::MediaItem;

    #[test]
    fn save_then_get_round_trips_invariant_2() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        let record = MediaRecord::new(item(1));
        let saved = store.save(record).unwrap();
        let fetched = store.get(1).unwrap().unwrap();
        assert_eq!(fetched.media_item.id, saved.media_item.id);
        assert_eq!(fetched.user_data.last_updated, saved.user_data.last_updated);
    }

    #[test]
    fn repair_rebuilds_index_from_record_files_scenario_s4() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RegistryStore::open(dir.path()).unwrap();
            store.save(MediaRecord::new(item(17))).unwrap();
            store.save(MediaRecord::new(item(18))).unwrap();
        }

        // Simulate: index missing entry for 18, stale entry for 99.
        let index_path = dir.path().join("registry/index.json");
        let mut index: RegistryIndex = serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
        index.media_index.remove(&18);
        index.media_index.insert(99, IndexEntry::from(&MediaRecord::new(item(99))));
        std::fs::write(&index_path, serde_json::to_vec_pretty(&index).unwrap()).unwrap();

        let store = RegistryStore::open(dir.path()).unwrap();
        let ids: BTreeSet<i64> = store.inner.lock().index.media_index.keys().copied().collect();
        assert_eq!(ids, BTreeSet::from([17, 18]));
    }

    #[test]
    fn delete_removes_record_and_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        store.save(MediaRecord::new(item(5))).unwrap();
        store.delete(5).unwrap();
        assert!(store.get(5).unwrap().is_none());
        assert!(!store.inner.lock().index.media_index.contains_key(&5));
    }

    #[test]
    fn list_orders_by_last_updated_descending() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        let mut older = MediaRecord::new(item(1));
        older.user_data.last_updated = Utc::now() - chrono::Duration::hours(1);
        store.save(older).unwrap();
        store.save(MediaRecord::new(item(2))).unwrap();

        let listed = store.list(ListFilter::default()).unwrap();
        assert_eq!(listed[0].media_item.id, 2);
        assert_eq!(listed[1].media_item.id, 1);
    }

    #[test]
    fn corrupt_record_is_quarantined_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        let path = store.record_path(7);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json at all {{{").unwrap();

        let result = store.get(7);
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(path.with_extension("json.corrupt").exists());
    }

    #[test]
    fn verify_detects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistryStore::open(dir.path()).unwrap();
        let mut record = MediaRecord::new(item(3));
        record.episode_mut(1).unwrap().apply_download_completion(
            "/nonexistent/path.mkv".into(),
            10,
            "1080".into(),
            None,
            Utc::now(),
            false,
        );
        let outcomes = store.verify(&record).unwrap();
        assert_eq!(outcomes[&1], VerifyOutcome::FileMissing);
    }

    #[test]
    fn verify_checks_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("e1.mkv");
        std::fs::write(&file_path, b"hello world").unwrap();
        let expected = sha256_hex(&file_path).unwrap();

        let store = RegistryStore::open(dir.path()).unwrap();
        let mut record = MediaRecord::new(item(4));
        record.episode_mut(1).unwrap().apply_download_completion(
            file_path.clone(),
            11,
            "1080".into(),
            Some(expected),
            Utc::now(),
            false,
        );
        let outcomes = store.verify(&record).unwrap();
        assert_eq!(outcomes[&1], VerifyOutcome::Ok);

        record.episode_mut(1).unwrap().checksum = Some("0".repeat(64));
        let outcomes = store.verify(&record).unwrap();
        assert_eq!(outcomes[&1], VerifyOutcome::ChecksumMismatch);
    }
}

//! Preview Cache (design §4.5): disk caches of cover/thumbnail images and
//! rendered info text, addressed by SHA-256 of a canonical input string,
//! populated through a pair of lazily-started worker pools sharing one
//! HTTP client. Grounded on the teacher's single-shared-client pattern
//! (`platforms::extractor::default::default_client`) and its
//! atomic-write-on-download shape (`mesio::hls::output`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fastanime_core::atomic::atomic_write;
use fastanime_core::config::PreviewMode;
use fastanime_core::media::MediaItem;
use fastanime_workers::{ThreadManager, WorkerPool};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{PreviewError, PreviewResult};

const MEDIA_POOL_NAME: &str = "preview-media";
const EPISODE_POOL_NAME: &str = "preview-episode";

pub struct PreviewCache {
    client: reqwest::Client,
    images_dir: PathBuf,
    info_dir: PathBuf,
    thread_manager: Arc<ThreadManager>,
    pool_width: usize,
    media_pool: OnceCell<Arc<WorkerPool>>,
    episode_pool: OnceCell<Arc<WorkerPool>>,
}

fn build_client(pool_width: usize, timeout: Duration) -> PreviewResult<reqwest::Client> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(pool_width)
        .timeout(timeout)
        .build()
        .map_err(PreviewError::from)
}

/// §4.5 hash key for a media item: its chosen display title.
pub fn media_key(item: &MediaItem) -> String {
    item.display_title()
}

/// §4.5 hash key for an episode: `<title>_Episode_<n>`.
pub fn episode_key(media: &MediaItem, episode_number: u32) -> String {
    format!("{}_Episode_{}", media.display_title(), episode_number)
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

impl PreviewCache {
    pub fn new(
        cache_dir: impl AsRef<Path>,
        thread_manager: Arc<ThreadManager>,
        pool_width: usize,
        request_timeout: Duration,
    ) -> PreviewResult<Self> {
        let root = cache_dir.as_ref().join("previews");
        Ok(Self {
            client: build_client(pool_width, request_timeout)?,
            images_dir: root.join("images"),
            info_dir: root.join("info"),
            thread_manager,
            pool_width,
            media_pool: OnceCell::new(),
            episode_pool: OnceCell::new(),
        })
    }

    pub fn image_path(&self, key: &str) -> PathBuf {
        self.images_dir.join(format!("{}.png", hash_key(key)))
    }

    pub fn info_path(&self, key: &str) -> PathBuf {
        self.info_dir.join(hash_key(key))
    }

    async fn media_pool(&self) -> PreviewResult<Arc<WorkerPool>> {
        let pool = self
            .media_pool
            .get_or_try_init(|| async {
                self.thread_manager
                    .register(WorkerPool::new(MEDIA_POOL_NAME, self.pool_width))
                    .map_err(PreviewError::from)
            })
            .await?;
        Ok(pool.clone())
    }

    async fn episode_pool(&self) -> PreviewResult<Arc<WorkerPool>> {
        let pool = self
            .episode_pool
            .get_or_try_init(|| async {
                self.thread_manager
                    .register(WorkerPool::new(EPISODE_POOL_NAME, self.pool_width))
                    .map_err(PreviewError::from)
            })
            .await?;
        Ok(pool.clone())
    }

    /// §4.5 `cache_media_previews`. Non-blocking: every submitted task
    /// runs on the worker pool, and failures are logged rather than
    /// propagated (the spec: "never propagated to the menu dispatch path").
    pub async fn cache_media_previews(&self, items: &[MediaItem], mode: PreviewMode) -> PreviewResult<()> {
        if mode == PreviewMode::None {
            return Ok(());
        }
        let pool = self.media_pool().await?;
        for item in items {
            let key = media_key(item);
            self.submit_item_previews(&pool, &key, item.cover_image.clone(), render_media_info(item), mode);
        }
        Ok(())
    }

    /// §4.5 `cache_episode_previews`. Falls back to the media cover when
    /// an episode carries no thumbnail of its own.
    pub async fn cache_episode_previews(
        &self,
        episodes: &[(u32, Option<String>)],
        media_item: &MediaItem,
        mode: PreviewMode,
    ) -> PreviewResult<()> {
        if mode == PreviewMode::None {
            return Ok(());
        }
        let pool = self.episode_pool().await?;
        for (number, thumbnail) in episodes {
            let key = episode_key(media_item, *number);
            let image_url = thumbnail.clone().or_else(|| media_item.cover_image.clone());
            let info = render_episode_info(media_item, *number);
            self.submit_item_previews(&pool, &key, image_url, info, mode);
        }
        Ok(())
    }

    fn submit_item_previews(
        &self,
        pool: &Arc<WorkerPool>,
        key: &str,
        image_url: Option<String>,
        info_text: String,
        mode: PreviewMode,
    ) {
        if matches!(mode, PreviewMode::Full | PreviewMode::Image) {
            if let Some(url) = image_url {
                let image_path = self.image_path(key);
                if !image_path.exists() {
                    let client = self.client.clone();
                    let label = format!("preview-image:{key}");
                    let submitted = pool.submit(label, move |token| async move {
                        download_to_path(&client, &url, &image_path, token).await
                    });
                    if let Err(e) = submitted {
                        warn!(key, error = %e, "failed to submit image preview task");
                    }
                }
            }
        }

        if matches!(mode, PreviewMode::Full | PreviewMode::Text) {
            let info_path = self.info_path(key);
            let label = format!("preview-info:{key}");
            let submitted = pool.submit(label, move |_token| async move {
                if let Err(e) = atomic_write(&info_path, info_text.as_bytes()) {
                    warn!(path = %info_path.display(), error = %e, "failed to write info preview");
                }
            });
            if let Err(e) = submitted {
                warn!(key, error = %e, "failed to submit info preview task");
            }
        }
    }
}

async fn download_to_path(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    token: tokio_util::sync::CancellationToken,
) {
    let response = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        result = client.get(url).send() => result,
    };

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            warn!(url, error = %e, "preview image request failed");
            return;
        }
    };

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    loop {
        let chunk = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            chunk = stream.next() => chunk,
        };
        match chunk {
            Some(Ok(chunk)) => bytes.extend_from_slice(&chunk),
            Some(Err(e)) => {
                warn!(url, error = %e, "preview image stream failed");
                return;
            }
            None => break,
        }
    }

    if let Err(e) = atomic_write(path, &bytes) {
        warn!(path = %path.display(), error = %e, "failed to write preview image");
    } else {
        debug!(path = %path.display(), bytes = bytes.len(), "preview image cached");
    }
}

fn render_media_info(item: &MediaItem) -> String {
    format!(
        "{title}\nStatus: {status:?}\nEpisodes: {episodes}\n",
        title = item.display_title(),
        status = item.status,
        episodes = item
            .episode_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".into()),
    )
}

fn render_episode_info(media: &MediaItem, episode_number: u32) -> String {
    format!("{} - Episode {}\n", media.display_title(), episode_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastanime_core::media::{MediaStatus, MediaTitle};

    fn item(id: i64) -> MediaItem {
        MediaItem {
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

    #[test]
    fn media_key_is_display_title() {
        assert_eq!(media_key(&item(1)), "Anime 1");
    }

    #[test]
    fn episode_key_matches_template() {
        assert_eq!(episode_key(&item(1), 3), "Anime 1_Episode_3");
    }

    #[test]
    fn same_key_hashes_to_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(ThreadManager::new());
        let cache = PreviewCache::new(dir.path(), manager, 2, Duration::from_secs(5)).unwrap();
        assert_eq!(cache.image_path("Anime 1"), cache.image_path("Anime 1"));
        assert_ne!(cache.image_path("Anime 1"), cache.image_path("Anime 2"));
    }

    #[tokio::test]
    async fn text_only_mode_skips_image_download() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(ThreadManager::new());
        let cache = PreviewCache::new(dir.path(), manager, 2, Duration::from_secs(5)).unwrap();
        let mut anime = item(7);
        anime.cover_image = Some("https://example.invalid/cover.png".into());

        cache
            .cache_media_previews(&[anime.clone()], PreviewMode::Text)
            .await
            .unwrap();

        // Give the submitted info-write task a chance to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.info_path(&media_key(&anime)).exists());
        assert!(!cache.image_path(&media_key(&anime)).exists());
    }
}

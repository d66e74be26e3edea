//! Immutable, strongly-typed configuration surface.
//!
//! Field set is ported from the upstream Python config model
//! (`core/config/model.py`), grouped the same way: general behavior,
//! streaming/playback, downloads, and the session engine's own knobs. Not
//! every upstream field is meaningful here — selector theming (fzf/rofi),
//! player argument strings, and image-renderer choice belong to the
//! peripheral surfaces this core does not implement, so only the fields
//! the core reads are kept; the rest of the upstream schema is the
//! surrounding CLI's concern.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

pub const ENV_PREFIX: &str = "FASTANIME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    Full,
    Text,
    Image,
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub auto_select_anime_result: bool,
    pub preview: PreviewMode,
    pub check_for_updates: bool,
    pub normalize_titles: bool,
    pub recent: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            auto_select_anime_result: true,
            preview: PreviewMode::None,
            check_for_updates: true,
            normalize_titles: true,
            recent: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub quality: String,
    pub translation_type: String,
    pub auto_next: bool,
    pub continue_from_watch_history: bool,
    pub episode_complete_at: u8,
    pub force_forward_tracking: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            quality: "1080".into(),
            translation_type: "sub".into(),
            auto_next: false,
            continue_from_watch_history: true,
            episode_complete_at: 80,
            force_forward_tracking: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub downloads_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    pub max_retries: u32,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            max_concurrent_downloads: 3,
            max_retries: 3,
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|u| u.video_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Write the auto-save snapshot after this many state transitions.
    pub auto_save_interval: u32,
    pub worker_pool_width: usize,
    #[serde(with = "duration_secs")]
    pub preview_request_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub worker_shutdown_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub engine_shutdown_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_save_interval: 5,
            worker_pool_width: 4,
            preview_request_timeout: Duration::from_secs(20),
            worker_shutdown_timeout: Duration::from_secs(30),
            engine_shutdown_grace: Duration::from_secs(5),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub stream: StreamConfig,
    pub downloads: DownloadsConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load from `path` if given, merging `Default` for absent keys, then
    /// apply `FASTANIME_*` environment overrides recognised by this crate.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(|e| crate::error::CoreError::io(p, e))?;
                toml::from_str(&raw)?
            }
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}_PREVIEW")) {
            self.general.preview = match v.to_lowercase().as_str() {
                "full" => PreviewMode::Full,
                "text" => PreviewMode::Text,
                "image" => PreviewMode::Image,
                _ => PreviewMode::None,
            };
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}_QUALITY")) {
            self.stream.quality = v;
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}_WORKER_POOL_WIDTH")) {
            if let Ok(n) = v.parse() {
                self.session.worker_pool_width = n;
            }
        }
    }
}

/// Resolves the platform-appropriate `<data>` and `<cache>` directories.
pub struct AppDirs {
    pub data: PathBuf,
    pub cache: PathBuf,
}

impl AppDirs {
    pub fn resolve() -> Option<Self> {
        let proj = directories::ProjectDirs::from("", "", "fastanime")?;
        Some(Self {
            data: proj.data_dir().to_path_buf(),
            cache: proj.cache_dir().to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.session.auto_save_interval, config.session.auto_save_interval);
    }

    #[test]
    fn env_override_wins() {
        // SAFETY: tests in this module do not run concurrently with code
        // that reads this variable.
        unsafe { std::env::set_var("FASTANIME_QUALITY", "480") };
        let config = Config::load(None).unwrap();
        assert_eq!(config.stream.quality, "480");
        unsafe { std::env::remove_var("FASTANIME_QUALITY") };
    }
}

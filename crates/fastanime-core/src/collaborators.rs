//! Narrow capability traits for the external collaborators named in the
//! design (§6): the media-metadata API client, the anime-provider
//! scraper, the player, and the selector front-end. Their real
//! implementations (HTTP scraping, IPC with an external player process,
//! fzf/rofi front-ends) are out of scope here; only the shapes the core
//! calls through are defined, plus a minimal stub of each for wiring the
//! engine end-to-end in tests and in the default CLI build.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::media::MediaItem;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub page: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub page: u32,
    pub has_next_page: bool,
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
}

/// Capability the session engine needs from the media-metadata API
/// (e.g. AniList/Jikan in the upstream project).
#[async_trait]
pub trait MediaApiClient: Send + Sync {
    async fn search_media(&self, params: SearchParams) -> Result<SearchResults, String>;
    fn is_authenticated(&self) -> bool;
    async fn authenticate(&self, token: &str) -> Result<Option<Profile>, String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimeParams {
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Anime {
    pub title: String,
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeStreamsParams {
    pub anime: Anime,
    pub episode_number: u32,
    pub translation_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub links: Vec<String>,
}

/// Capability the session engine needs from an anime-provider scraper.
#[async_trait]
pub trait AnimeProvider: Send + Sync {
    async fn search(&self, params: AnimeParams) -> Result<Vec<Anime>, String>;
    async fn get(&self, params: AnimeParams) -> Result<Option<Anime>, String>;
    async fn episode_streams(&self, params: EpisodeStreamsParams) -> Result<Vec<Server>, String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerParams {
    pub url: String,
    pub title: String,
    pub start_from: Option<String>,
}

/// `exit_status == 0` means a clean exit; `stop_time`/`total_time` are
/// `"HH:MM:SS"` strings, as produced by the external player's IPC layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerResult {
    pub exit_status: i32,
    pub stop_time: Option<String>,
    pub total_time: Option<String>,
}

#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, params: PlayerParams) -> Result<PlayerResult, String>;
}

#[async_trait]
pub trait Selector: Send + Sync {
    async fn choose(&self, prompt: &str, choices: &[String]) -> Result<Option<String>, String>;
    async fn choose_multiple(&self, prompt: &str, choices: &[String]) -> Result<Vec<String>, String>;
    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool, String>;
    async fn ask(&self, prompt: &str, default: Option<&str>) -> Result<Option<String>, String>;
}

/// Context bundles every collaborator the engine and its handlers may call
/// through. Built once at construction and never persisted — this is the
/// ephemeral half of the split the design calls for (state is
/// serializable, context is not).
pub struct Collaborators {
    pub media_api: Box<dyn MediaApiClient>,
    pub provider: Box<dyn AnimeProvider>,
    pub player: Box<dyn Player>,
    /// Shared, not owned exclusively: the Feedback Service also holds a
    /// handle to drive its own prompts through the same front-end.
    pub selector: Arc<dyn Selector>,
}

/// No-op stand-ins sufficient to exercise the engine without a real
/// network or terminal. Not meant to satisfy a user-facing build.
pub mod stub {
    use super::*;

    pub struct NullMediaApiClient;

    #[async_trait]
    impl MediaApiClient for NullMediaApiClient {
        async fn search_media(&self, _params: SearchParams) -> Result<SearchResults, String> {
            Ok(SearchResults::default())
        }

        fn is_authenticated(&self) -> bool {
            false
        }

        async fn authenticate(&self, _token: &str) -> Result<Option<Profile>, String> {
            Ok(None)
        }
    }

    pub struct NullAnimeProvider;

    #[async_trait]
    impl AnimeProvider for NullAnimeProvider {
        async fn search(&self, _params: AnimeParams) -> Result<Vec<Anime>, String> {
            Ok(Vec::new())
        }

        async fn get(&self, _params: AnimeParams) -> Result<Option<Anime>, String> {
            Ok(None)
        }

        async fn episode_streams(&self, _params: EpisodeStreamsParams) -> Result<Vec<Server>, String> {
            Ok(Vec::new())
        }
    }

    pub struct NullPlayer;

    #[async_trait]
    impl Player for NullPlayer {
        async fn play(&self, _params: PlayerParams) -> Result<PlayerResult, String> {
            Ok(PlayerResult {
                exit_status: 0,
                stop_time: None,
                total_time: None,
            })
        }
    }

    pub struct NullSelector;

    #[async_trait]
    impl Selector for NullSelector {
        async fn choose(&self, _prompt: &str, _choices: &[String]) -> Result<Option<String>, String> {
            Ok(None)
        }

        async fn choose_multiple(&self, _prompt: &str, _choices: &[String]) -> Result<Vec<String>, String> {
            Ok(Vec::new())
        }

        async fn confirm(&self, _prompt: &str, default: bool) -> Result<bool, String> {
            Ok(default)
        }

        async fn ask(&self, _prompt: &str, default: Option<&str>) -> Result<Option<String>, String> {
            Ok(default.map(str::to_owned))
        }
    }
}

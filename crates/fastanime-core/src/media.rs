//! `MediaItem`: the value type the spec treats as "external, opaque" —
//! owned by the media-metadata API client in the full system, but still
//! needs a concrete shape here since it is embedded in every
//! [`crate::error`]-adjacent `MediaRecord`. Trimmed from the upstream
//! AniList mapper (`libs/media_api/anilist/types.py`) down to the fields
//! the registry and session actually read: identity, display titles,
//! status, episode count, and a cover image URL.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTitle {
    pub english: Option<String>,
    pub romaji: Option<String>,
    pub native: Option<String>,
}

impl MediaTitle {
    /// Preference order matches the upstream `display_title` property:
    /// english, then romaji, then native.
    pub fn preferred(&self) -> Option<&str> {
        self.english
            .as_deref()
            .or(self.romaji.as_deref())
            .or(self.native.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    pub title: MediaTitle,
    pub status: MediaStatus,
    /// `None` while the anime is still airing and the total is unknown.
    pub episode_count: Option<u32>,
    pub cover_image: Option<String>,
}

impl MediaItem {
    pub fn display_title(&self) -> String {
        self.title
            .preferred()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Anime #{}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_id_when_titles_are_empty() {
        let item = MediaItem {
            id: 42,
            title: MediaTitle::default(),
            status: MediaStatus::Releasing,
            episode_count: None,
            cover_image: None,
        };
        assert_eq!(item.display_title(), "Anime #42");
    }

    #[test]
    fn prefers_english_title() {
        let item = MediaItem {
            id: 1,
            title: MediaTitle {
                english: Some("Title".into()),
                romaji: Some("Taitoru".into()),
                native: None,
            },
            status: MediaStatus::Finished,
            episode_count: Some(12),
            cover_image: None,
        };
        assert_eq!(item.display_title(), "Title");
    }
}

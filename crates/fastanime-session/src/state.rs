//! Session State (design §4.6): the typed, serializable data each menu
//! needs. Mutations build a modified copy rather than mutating in
//! place — handlers receive an owned `State`, clone its sub-records as
//! needed, and return the edited copy. Ported from the upstream
//! `interactive/state.py` session-state model, collapsed from its four
//! independently-subclassed state trees into one `State` struct with
//! optional sub-records, matching this design's simpler single-struct
//! shape.

use fastanime_core::collaborators::{Anime, PlayerResult, SearchParams, Server};
use fastanime_core::media::MediaItem;
use serde::{Deserialize, Serialize};

/// Identifies which registered handler should dispatch a [`State`].
pub type MenuTag = String;

pub const MAIN_MENU: &str = "main";
pub const SEARCH_RESULTS: &str = "search_results";
pub const MEDIA_ACTIONS: &str = "media_actions";
pub const EPISODES: &str = "episodes";
pub const SERVERS: &str = "servers";

/// Current AniList-style search/browse state: query params, page info,
/// the current page's results, and which one is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaApiState {
    pub search_params: Option<SearchParams>,
    pub has_next_page: bool,
    pub results: Vec<MediaItem>,
    pub selected_media_id: Option<i64>,
}

/// Provider-scraper state: the resolved provider-side anime, the
/// episode being worked with, available servers, and the last playback
/// outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderState {
    pub selected_anime: Option<Anime>,
    pub current_episode: Option<u32>,
    pub servers: Vec<Server>,
    pub chosen_server: Option<String>,
    pub last_player_result: Option<PlayerResult>,
}

/// Scratch pagination state, kept separate from `MediaApiState` because
/// it is meaningful even for menus that browse something other than the
/// media API (e.g. a provider's own paginated episode list).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_page: u32,
}

/// One entry in the session history stack: a menu tag plus whichever
/// sub-records that menu's handler reads. Unused sub-records are
/// `None` — e.g. the main menu needs none of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub menu_tag: MenuTag,
    #[serde(default)]
    pub media_api: Option<MediaApiState>,
    #[serde(default)]
    pub provider: Option<ProviderState>,
    #[serde(default)]
    pub navigation: Option<NavigationState>,
}

impl State {
    pub fn new(menu_tag: impl Into<String>) -> Self {
        Self {
            menu_tag: menu_tag.into(),
            media_api: None,
            provider: None,
            navigation: None,
        }
    }

    pub fn main() -> Self {
        Self::new(MAIN_MENU)
    }

    pub fn with_media_api(mut self, media_api: MediaApiState) -> Self {
        self.media_api = Some(media_api);
        self
    }

    pub fn with_provider(mut self, provider: ProviderState) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationState) -> Self {
        self.navigation = Some(navigation);
        self
    }
}

/// A handler's non-`State` return value: a navigation command
/// interpreted by the engine's main loop (design §4.7.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Back,
    BackX2,
    BackX3,
    Main,
    Reload,
    ConfigEdit,
    Exit,
}

/// What a handler returns: either a new state to push, or a directive.
pub enum HandlerOutcome {
    Push(State),
    Directive(Directive),
}

impl From<State> for HandlerOutcome {
    fn from(state: State) -> Self {
        HandlerOutcome::Push(state)
    }
}

impl From<Directive> for HandlerOutcome {
    fn from(directive: Directive) -> Self {
        HandlerOutcome::Directive(directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_json_with_unset_substates() {
        let state = State::main();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: State = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn unknown_top_level_key_is_ignored_not_fatal() {
        let json = r#"{"menu_tag": "main", "mystery_field": 42}"#;
        let parsed: Result<State, _> = serde_json::from_str(json);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().menu_tag, "main");
    }
}

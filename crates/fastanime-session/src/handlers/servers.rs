//! Servers handler: resolve stream servers for the chosen episode, play
//! the chosen one, then record the playback event against the registry
//! and back out to the episodes menu. Ported from
//! `interactive/menus/servers.py` and `services/registry/tracker.py`'s
//! playback-event caller.

use async_trait::async_trait;
use fastanime_core::collaborators::{EpisodeStreamsParams, PlayerParams};
use fastanime_registry::RegistryTracker;
use tracing::warn;

use crate::context::EngineContext;
use crate::error::SessionResult;
use crate::menu_registry::Handler;
use crate::state::{Directive, HandlerOutcome, State};

pub struct ServersHandler;

#[async_trait]
impl Handler for ServersHandler {
    async fn handle(&self, context: &EngineContext, state: State) -> SessionResult<HandlerOutcome> {
        let Some(provider_state) = state.provider.clone() else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        let (Some(anime), Some(episode_number)) =
            (provider_state.selected_anime.clone(), provider_state.current_episode)
        else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };

        let params = EpisodeStreamsParams {
            anime: anime.clone(),
            episode_number,
            translation_type: context.config.stream.translation_type.clone(),
        };
        let servers = match context.collaborators.provider.episode_streams(params).await {
            Ok(servers) if !servers.is_empty() => servers,
            Ok(_) => {
                warn!(episode_number, "no servers available for this episode");
                return Ok(HandlerOutcome::Directive(Directive::Back));
            }
            Err(e) => {
                warn!(episode_number, error = %e, "failed to fetch episode streams");
                return Ok(HandlerOutcome::Directive(Directive::Back));
            }
        };

        let names: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
        let choice = context
            .collaborators
            .selector
            .choose("Choose a server", &names)
            .await
            .unwrap_or(None);
        let Some(chosen_name) = choice else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        let Some(server) = servers.iter().find(|s| s.name == chosen_name) else {
            return Ok(HandlerOutcome::Directive(Directive::Reload));
        };
        let Some(url) = server.links.first().cloned() else {
            warn!(server = chosen_name, "server advertised no playable links");
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };

        let player_params = PlayerParams {
            url,
            title: format!("{} - Episode {}", anime.title, episode_number),
            start_from: None,
        };
        let result = match context.collaborators.player.play(player_params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "playback failed");
                return Ok(HandlerOutcome::Directive(Directive::Back));
            }
        };

        if let (Some(stop_time), Some(total_time)) = (&result.stop_time, &result.total_time) {
            if let Some(media_id) = state.media_api.as_ref().and_then(|m| m.selected_media_id) {
                let tracker = RegistryTracker::new(&context.registry);
                tracker.record_playback(media_id, episode_number, stop_time, total_time);
            }
        }

        Ok(HandlerOutcome::Directive(Directive::Back))
    }
}

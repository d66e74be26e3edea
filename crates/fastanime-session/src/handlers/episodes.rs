//! Episodes handler: choose an episode number, defaulting to the
//! registry's resume point, then push the servers menu. Ported from
//! `interactive/menus/episodes.py`.

use async_trait::async_trait;
use tracing::warn;

use crate::context::EngineContext;
use crate::error::SessionResult;
use crate::menu_registry::Handler;
use crate::state::{Directive, HandlerOutcome, State, SERVERS};

pub struct EpisodesHandler;

#[async_trait]
impl Handler for EpisodesHandler {
    async fn handle(&self, context: &EngineContext, state: State) -> SessionResult<HandlerOutcome> {
        let Some(provider_state) = state.provider.clone() else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        let Some(anime) = provider_state.selected_anime.clone() else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        let total = anime.episode_count.unwrap_or(0);
        if total == 0 {
            warn!("provider anime has no known episode count");
            return Ok(HandlerOutcome::Directive(Directive::Back));
        }

        let mut choices: Vec<String> = (1..=total).map(|n| n.to_string()).collect();
        choices.push("Back".to_string());

        let default_choice = provider_state.current_episode.map(|n| n.to_string());
        let choice = context
            .collaborators
            .selector
            .choose("Choose an episode", &choices)
            .await
            .unwrap_or(default_choice);

        match choice.as_deref() {
            Some("Back") | None => Ok(HandlerOutcome::Directive(Directive::Back)),
            Some(number) => {
                let Ok(episode_number) = number.parse::<u32>() else {
                    return Ok(HandlerOutcome::Directive(Directive::Reload));
                };
                let mut next_provider_state = provider_state.clone();
                next_provider_state.current_episode = Some(episode_number);
                Ok(State::new(SERVERS)
                    .with_media_api(state.media_api.clone().unwrap_or_default())
                    .with_provider(next_provider_state)
                    .into())
            }
        }
    }
}

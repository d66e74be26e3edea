//! Media actions handler: ensures a registry record exists for the
//! selected title, then either hands off to the episodes menu (resolving
//! the provider-side anime and the registry's resume point) or backs out.
//! Ported from `interactive/menus/media_actions.py`.

use async_trait::async_trait;
use fastanime_core::collaborators::AnimeParams;
use fastanime_registry::{MediaRecord, RegistryTracker};
use tracing::warn;

use crate::context::EngineContext;
use crate::error::SessionResult;
use crate::menu_registry::Handler;
use crate::state::{Directive, HandlerOutcome, ProviderState, State, EPISODES};

pub struct MediaActionsHandler;

#[async_trait]
impl Handler for MediaActionsHandler {
    async fn handle(&self, context: &EngineContext, state: State) -> SessionResult<HandlerOutcome> {
        let Some(media_api) = state.media_api.clone() else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        let Some(media_id) = media_api.selected_media_id else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        let Some(item) = media_api.results.iter().find(|m| m.id == media_id).cloned() else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };

        if context.registry.get(media_id)?.is_none() {
            context.registry.save(MediaRecord::new(item.clone()))?;
        }

        let choices = vec!["Watch".to_string(), "Back".to_string()];
        let choice = context
            .collaborators
            .selector
            .choose("Media actions", &choices)
            .await
            .unwrap_or(None);

        match choice.as_deref() {
            Some("Watch") => {
                let params = AnimeParams { title: item.display_title() };
                match context.collaborators.provider.get(params).await {
                    Ok(Some(anime)) => {
                        let tracker = RegistryTracker::new(&context.registry);
                        let available: Vec<u32> = (1..=anime.episode_count.unwrap_or(0)).collect();
                        let resume_episode = tracker.continue_episode(media_id, &available);

                        let provider_state = ProviderState {
                            selected_anime: Some(anime),
                            current_episode: resume_episode,
                            servers: Vec::new(),
                            chosen_server: None,
                            last_player_result: None,
                        };
                        Ok(State::new(EPISODES)
                            .with_media_api(media_api)
                            .with_provider(provider_state)
                            .into())
                    }
                    Ok(None) => {
                        warn!(media_id, "provider has no entry for this title");
                        Ok(HandlerOutcome::Directive(Directive::Reload))
                    }
                    Err(e) => {
                        warn!(media_id, error = %e, "provider lookup failed");
                        Ok(HandlerOutcome::Directive(Directive::Reload))
                    }
                }
            }
            _ => Ok(HandlerOutcome::Directive(Directive::Back)),
        }
    }
}

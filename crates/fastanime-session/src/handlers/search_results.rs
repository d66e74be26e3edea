//! Search results handler: browse a page of [`MediaItem`]s, page forward,
//! or select one into the media-actions menu. Ported from
//! `anilist/states/menu_states.py`'s `ResultsState`, with pagination
//! modelled as pushing a fresh same-tag state rather than mutating one in
//! place (this workspace's stack is append-only from a handler's view).

use async_trait::async_trait;
use tracing::warn;

use crate::context::EngineContext;
use crate::error::SessionResult;
use crate::menu_registry::Handler;
use crate::state::{Directive, HandlerOutcome, MediaApiState, State, MEDIA_ACTIONS, SEARCH_RESULTS};

pub struct SearchResultsHandler;

#[async_trait]
impl Handler for SearchResultsHandler {
    async fn handle(&self, context: &EngineContext, state: State) -> SessionResult<HandlerOutcome> {
        let Some(media_api) = state.media_api.clone() else {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        };
        if media_api.results.is_empty() {
            return Ok(HandlerOutcome::Directive(Directive::Back));
        }

        let mut choices: Vec<String> = media_api.results.iter().map(|item| item.display_title()).collect();
        if media_api.has_next_page {
            choices.push("Next page".to_string());
        }
        choices.push("Back".to_string());

        let choice = context
            .collaborators
            .selector
            .choose("Search results", &choices)
            .await
            .unwrap_or(None);

        match choice.as_deref() {
            Some("Back") | None => Ok(HandlerOutcome::Directive(Directive::Back)),
            Some("Next page") => {
                let Some(params) = media_api.search_params.clone() else {
                    return Ok(HandlerOutcome::Directive(Directive::Back));
                };
                let next_params = fastanime_core::collaborators::SearchParams {
                    page: params.page + 1,
                    ..params
                };
                match context.collaborators.media_api.search_media(next_params.clone()).await {
                    Ok(results) => {
                        let next_media_api = MediaApiState {
                            search_params: Some(next_params),
                            has_next_page: results.has_next_page,
                            results: results.media,
                            selected_media_id: None,
                        };
                        Ok(State::new(SEARCH_RESULTS).with_media_api(next_media_api).into())
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to fetch next page");
                        Ok(HandlerOutcome::Directive(Directive::Reload))
                    }
                }
            }
            Some(title) => {
                let selected = media_api.results.iter().find(|item| item.display_title() == title).cloned();
                let Some(item) = selected else {
                    return Ok(HandlerOutcome::Directive(Directive::Reload));
                };
                let mut next_media_api = media_api.clone();
                next_media_api.selected_media_id = Some(item.id);
                Ok(State::new(MEDIA_ACTIONS).with_media_api(next_media_api).into())
            }
        }
    }
}

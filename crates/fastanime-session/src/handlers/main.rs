//! Main menu handler: the root of the stack. Grounded on
//! `interactive/menus/main.py`'s "search or quit" entry point, collapsed
//! to what this workspace's stub collaborators can actually drive.

use async_trait::async_trait;
use fastanime_core::collaborators::SearchParams;
use tracing::warn;

use crate::context::EngineContext;
use crate::error::SessionResult;
use crate::menu_registry::Handler;
use crate::state::{Directive, HandlerOutcome, MediaApiState, State, SEARCH_RESULTS};

pub struct MainMenuHandler;

#[async_trait]
impl Handler for MainMenuHandler {
    async fn handle(&self, context: &EngineContext, _state: State) -> SessionResult<HandlerOutcome> {
        let choices = vec!["Search".to_string(), "Exit".to_string()];
        let choice = context
            .collaborators
            .selector
            .choose("Main menu", &choices)
            .await
            .unwrap_or(None);

        match choice.as_deref() {
            Some("Search") => {
                let query = context
                    .collaborators
                    .selector
                    .ask("Search query", None)
                    .await
                    .unwrap_or(None);
                let Some(query) = query else {
                    return Ok(HandlerOutcome::Directive(Directive::Reload));
                };

                let params = SearchParams { query, page: 1 };
                match context.collaborators.media_api.search_media(params.clone()).await {
                    Ok(results) => {
                        if let Err(e) = context
                            .previews
                            .cache_media_previews(&results.media, context.config.general.preview)
                            .await
                        {
                            warn!(error = %e, "failed to submit media previews");
                        }

                        let media_api = MediaApiState {
                            search_params: Some(params),
                            has_next_page: results.has_next_page,
                            results: results.media,
                            selected_media_id: None,
                        };
                        Ok(State::new(SEARCH_RESULTS).with_media_api(media_api).into())
                    }
                    Err(e) => {
                        warn!(error = %e, "search failed");
                        Ok(HandlerOutcome::Directive(Directive::Reload))
                    }
                }
            }
            Some("Exit") => Ok(HandlerOutcome::Directive(Directive::Exit)),
            _ => Ok(HandlerOutcome::Directive(Directive::Reload)),
        }
    }
}

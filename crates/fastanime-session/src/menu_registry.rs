//! Menu Registry (design §4.8): a process-local `{MenuTag -> Handler}`
//! map. Handlers self-register explicitly at `SessionEngine::builder()`
//! time rather than via import-time side effects (spec §9 redesign
//! flag) — the ported Python project discovers handlers by importing a
//! configured directory; this workspace's equivalent is an explicit
//! `register` call per handler.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::context::EngineContext;
use crate::error::{SessionError, SessionResult};
use crate::state::{HandlerOutcome, MenuTag, State};

/// `(context, state) -> State | Directive`. Handlers must not hold the
/// registry lock across a suspension point — there are none in this
/// model (§5), so this is automatically satisfied by any handler that
/// only calls back into `EngineContext`'s own locked accessors.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, context: &EngineContext, state: State) -> SessionResult<HandlerOutcome>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<MenuTag, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `tag`. Redefining an existing tag is a
    /// warning, last-writer-wins.
    pub fn register(&mut self, tag: impl Into<String>, handler: Box<dyn Handler>) {
        let tag = tag.into();
        if self.handlers.contains_key(&tag) {
            warn!(menu_tag = %tag, "redefining existing menu handler, last registration wins");
        }
        self.handlers.insert(tag, handler);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Deterministic lookup and dispatch; no fallback handler. An
    /// unregistered tag is a fatal `UnknownMenu` error.
    pub async fn dispatch(&self, context: &EngineContext, state: State) -> SessionResult<HandlerOutcome> {
        let tag = state.menu_tag.clone();
        let handler = self
            .handlers
            .get(&tag)
            .ok_or_else(|| SessionError::UnknownMenu(tag))?;
        handler.handle(context, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Directive;

    struct AlwaysExit;

    #[async_trait]
    impl Handler for AlwaysExit {
        async fn handle(&self, _context: &EngineContext, _state: State) -> SessionResult<HandlerOutcome> {
            Ok(HandlerOutcome::Directive(Directive::Exit))
        }
    }

    #[tokio::test]
    async fn dispatch_to_unknown_tag_is_fatal() {
        let registry = HandlerRegistry::new();
        let context = EngineContext::for_test().await;
        let result = registry.dispatch(&context, State::new("no_such_menu")).await;
        assert!(matches!(result, Err(SessionError::UnknownMenu(tag)) if tag == "no_such_menu"));
    }

    #[tokio::test]
    async fn last_registration_wins_on_redefinition() {
        let mut registry = HandlerRegistry::new();
        registry.register("main", Box::new(AlwaysExit));
        registry.register("main", Box::new(AlwaysExit));
        assert!(registry.contains("main"));
    }
}

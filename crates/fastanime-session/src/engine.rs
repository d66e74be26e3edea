//! Session Engine (design §4.7): the stack-of-states navigation loop,
//! auto-save, crash-backup, and resume. Single-foreground-thread by
//! contract (§5) — handlers never suspend, they return and the engine
//! re-enters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::context::EngineContext;
use crate::error::SessionResult;
use crate::feedback::FeedbackService;
use crate::menu_registry::{Handler, HandlerRegistry};
use crate::session_data::SessionData;
use crate::state::{Directive, HandlerOutcome, State};

pub struct SessionPaths {
    pub auto_save: PathBuf,
    pub crash_backup: PathBuf,
}

impl SessionPaths {
    pub fn under(data_dir: &Path) -> Self {
        let sessions = data_dir.join("sessions");
        Self {
            auto_save: sessions.join("auto_save.json"),
            crash_backup: sessions.join("crash_backup.json"),
        }
    }

    pub fn named(&self, data_dir: &Path, name: &str) -> PathBuf {
        data_dir.join("sessions").join(format!("{name}.json"))
    }
}

pub enum ResumeSource {
    MostRecent,
    Path(PathBuf),
}

pub struct SessionEngineBuilder {
    handlers: HandlerRegistry,
}

impl SessionEngineBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
        }
    }

    pub fn register_handler(mut self, tag: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.handlers.register(tag, handler);
        self
    }

    pub async fn build(
        self,
        context: EngineContext,
        paths: SessionPaths,
        resume: Option<ResumeSource>,
    ) -> SessionResult<SessionEngine> {
        let feedback = FeedbackService::new(context.selector_handle(), false);
        let auto_save_interval = context.config.session.auto_save_interval;
        let engine_shutdown_grace = context.config.session.engine_shutdown_grace;

        let mut engine = SessionEngine {
            context,
            handlers: self.handlers,
            feedback,
            history: vec![State::main()],
            created_at: Utc::now(),
            paths,
            auto_save_interval,
            changes_since_save: 0,
            engine_shutdown_grace,
        };
        engine.resume(resume).await;
        Ok(engine)
    }
}

impl Default for SessionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionEngine {
    context: EngineContext,
    handlers: HandlerRegistry,
    feedback: FeedbackService,
    history: Vec<State>,
    created_at: chrono::DateTime<Utc>,
    paths: SessionPaths,
    auto_save_interval: u32,
    changes_since_save: u32,
    engine_shutdown_grace: Duration,
}

impl SessionEngine {
    pub fn history(&self) -> &[State] {
        &self.history
    }

    /// §4.7.2 resume: offers the crash-backup first, then the requested
    /// source. An empty or invalid resume leaves the default `[Main]`
    /// stack untouched.
    async fn resume(&mut self, requested: Option<ResumeSource>) {
        if self.paths.crash_backup.exists() {
            let accept = self.feedback.confirm("A previous session crashed. Resume it?", true).await;
            if accept {
                if let Some(history) = self.load_valid_history(&self.paths.crash_backup.clone()) {
                    info!("resumed from crash backup");
                    self.history = history;
                    let _ = std::fs::remove_file(&self.paths.crash_backup);
                    return;
                }
                warn!("crash backup was invalid, ignoring");
            }
        }

        let source_path = match requested {
            Some(ResumeSource::MostRecent) => Some(self.paths.auto_save.clone()),
            Some(ResumeSource::Path(path)) => Some(path),
            None => None,
        };
        if let Some(path) = source_path {
            if let Some(history) = self.load_valid_history(&path) {
                self.history = history;
                return;
            }
            warn!(path = %path.display(), "resume source was empty or invalid, starting at Main menu");
        }
    }

    fn load_valid_history(&self, path: &Path) -> Option<Vec<State>> {
        if !path.exists() {
            return None;
        }
        let data = SessionData::load(path).ok()?;
        if data.history.is_empty() {
            return None;
        }
        if data.history.iter().any(|s| !self.handlers.contains(&s.menu_tag)) {
            return None;
        }
        Some(data.history)
    }

    /// §4.7.3 main loop.
    pub async fn run(mut self) -> SessionResult<()> {
        loop {
            let Some(current) = self.history.last().cloned() else {
                break;
            };

            let outcome = match self.handlers.dispatch(&self.context, current).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // §4.7.5 crash-backup: serialize, then re-raise once.
                    self.write_snapshot(&self.paths.crash_backup.clone());
                    return Err(e);
                }
            };

            match outcome {
                HandlerOutcome::Push(state) => {
                    self.history.push(state);
                    self.note_change();
                }
                HandlerOutcome::Directive(Directive::Back) => {
                    if self.history.len() > 1 {
                        self.history.pop();
                        self.note_change();
                    }
                }
                HandlerOutcome::Directive(Directive::BackX2) => self.pop_n(2),
                HandlerOutcome::Directive(Directive::BackX3) => self.pop_n(3),
                HandlerOutcome::Directive(Directive::Main) => {
                    self.history.truncate(1);
                    self.note_change();
                    self.write_snapshot(&self.paths.auto_save.clone());
                    self.changes_since_save = 0;
                }
                HandlerOutcome::Directive(Directive::Reload) => {}
                HandlerOutcome::Directive(Directive::ConfigEdit) => {
                    self.reload_context();
                }
                HandlerOutcome::Directive(Directive::Exit) => {
                    self.write_snapshot(&self.paths.auto_save.clone());
                    self.changes_since_save = 0;
                    break;
                }
            }

            if self.changes_since_save >= self.auto_save_interval {
                self.write_snapshot(&self.paths.auto_save.clone());
                self.changes_since_save = 0;
            }
        }

        self.clean_shutdown().await;
        Ok(())
    }

    fn pop_n(&mut self, n: usize) {
        if self.history.len() > n {
            self.history.truncate(self.history.len() - n);
            self.note_change();
        }
    }

    fn note_change(&mut self) {
        self.changes_since_save += 1;
    }

    fn reload_context(&mut self) {
        if let Some(path) = self.context.config_path.clone() {
            match fastanime_core::config::Config::load(Some(&path)) {
                Ok(config) => self.context.config = config,
                Err(e) => warn!(error = %e, "failed to reload config, keeping previous"),
            }
        }
    }

    fn write_snapshot(&self, path: &Path) {
        let data = SessionData::from_history(self.history.clone(), None, self.created_at);
        if let Err(e) = data.save(path) {
            warn!(path = %path.display(), error = %e, "failed to write session snapshot");
        }
    }

    /// §4.7.6 clean shutdown: drain worker pools with a short grace
    /// period, delete the auto-save file, leave the crash-backup file
    /// deleted.
    async fn clean_shutdown(&self) {
        self.context
            .workers
            .shutdown_all(true, self.engine_shutdown_grace)
            .await;
        let _ = std::fs::remove_file(&self.paths.auto_save);
        let _ = std::fs::remove_file(&self.paths.crash_backup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MAIN_MENU, MEDIA_ACTIONS, SEARCH_RESULTS};
    use async_trait::async_trait;

    struct ScriptedHandler {
        outcomes: parking_lot::Mutex<Vec<HandlerOutcome>>,
    }

    #[async_trait]
    impl Handler for ScriptedHandler {
        async fn handle(&self, _context: &EngineContext, _state: State) -> SessionResult<HandlerOutcome> {
            let mut outcomes = self.outcomes.lock();
            Ok(outcomes.pop().unwrap_or(HandlerOutcome::Directive(Directive::Exit)))
        }
    }

    fn scripted(mut outcomes: Vec<HandlerOutcome>) -> Box<ScriptedHandler> {
        outcomes.reverse();
        Box::new(ScriptedHandler {
            outcomes: parking_lot::Mutex::new(outcomes),
        })
    }

    /// Scenario S6: BACK at root is a no-op.
    #[tokio::test]
    async fn back_at_root_is_a_no_op_scenario_s6() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::under(dir.path());
        let context = EngineContext::for_test().await;

        let engine = SessionEngineBuilder::new()
            .register_handler(
                MAIN_MENU,
                scripted(vec![
                    HandlerOutcome::Directive(Directive::Back),
                    HandlerOutcome::Directive(Directive::Exit),
                ]),
            )
            .build(context, paths, None)
            .await
            .unwrap();

        engine.run().await.unwrap();
    }

    /// Invariant 6: MAIN truncates to one element.
    #[tokio::test]
    async fn main_directive_truncates_stack_invariant_6() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::under(dir.path());
        let context = EngineContext::for_test().await;

        let engine = SessionEngineBuilder::new()
            .register_handler(MAIN_MENU, scripted(vec![State::new(SEARCH_RESULTS).into()]))
            .register_handler(
                SEARCH_RESULTS,
                scripted(vec![
                    State::new(MEDIA_ACTIONS).into(),
                ]),
            )
            .register_handler(
                MEDIA_ACTIONS,
                scripted(vec![HandlerOutcome::Directive(Directive::Main)]),
            )
            .build(context, paths, None)
            .await
            .unwrap();

        // After MAIN_MENU -> SEARCH_RESULTS -> MEDIA_ACTIONS -> MAIN, the
        // stack should be truncated back to [MAIN_MENU] and MAIN_MENU's
        // handler (exhausted script) defaults to Exit.
        engine.run().await.unwrap();
    }

    /// Scenario S1: resume after crash.
    #[tokio::test]
    async fn resumes_from_crash_backup_scenario_s1() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::under(dir.path());
        std::fs::create_dir_all(paths.crash_backup.parent().unwrap()).unwrap();
        let history = vec![State::new(MAIN_MENU), State::new(SEARCH_RESULTS), State::new(MEDIA_ACTIONS)];
        let snapshot = SessionData::from_history(history.clone(), None, Utc::now());
        snapshot.save(&paths.crash_backup).unwrap();

        let context = EngineContext::for_test().await;
        let engine = SessionEngineBuilder::new()
            .register_handler(MAIN_MENU, scripted(vec![]))
            .register_handler(SEARCH_RESULTS, scripted(vec![]))
            .register_handler(
                MEDIA_ACTIONS,
                scripted(vec![HandlerOutcome::Directive(Directive::Exit)]),
            )
            .build(context, paths, None)
            .await
            .unwrap();

        assert_eq!(engine.history().len(), 3);
        assert_eq!(engine.history()[0].menu_tag, MAIN_MENU);
        assert_eq!(engine.history().last().unwrap().menu_tag, MEDIA_ACTIONS);
    }
}

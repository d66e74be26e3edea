//! The engine's process-wide context: every collaborator and resource a
//! handler may call through. Built once at construction, never
//! persisted — the ephemeral counterpart to the serializable [`crate::state::State`].

use std::path::PathBuf;
use std::sync::Arc;

use fastanime_core::collaborators::{Collaborators, Selector};
use fastanime_core::config::Config;
use fastanime_preview::PreviewCache;
use fastanime_registry::RegistryStore;
use fastanime_workers::ThreadManager;

pub struct EngineContext {
    pub config: Config,
    /// Where `config` was loaded from, if anywhere; `None` for defaults
    /// built without a file (e.g. tests). Used by `CONFIG_EDIT` to reload.
    pub config_path: Option<PathBuf>,
    pub collaborators: Collaborators,
    pub registry: Arc<RegistryStore>,
    pub workers: Arc<ThreadManager>,
    pub previews: Arc<PreviewCache>,
}

impl EngineContext {
    pub fn selector_handle(&self) -> Arc<dyn Selector> {
        self.collaborators.selector.clone()
    }

    #[cfg(test)]
    pub async fn for_test() -> Self {
        use fastanime_core::collaborators::stub::{NullAnimeProvider, NullMediaApiClient, NullPlayer, NullSelector};

        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let registry = Arc::new(RegistryStore::open(dir.path()).unwrap());
        let workers = Arc::new(ThreadManager::new());
        let previews = Arc::new(
            PreviewCache::new(
                dir.path(),
                workers.clone(),
                config.session.worker_pool_width,
                config.session.preview_request_timeout,
            )
            .unwrap(),
        );
        // Keep the tempdir alive for the lifetime of the test process by
        // leaking it; tests run in short-lived processes so this is fine.
        std::mem::forget(dir);

        Self {
            config,
            config_path: None,
            collaborators: Collaborators {
                media_api: Box::new(NullMediaApiClient),
                provider: Box::new(NullAnimeProvider),
                player: Box::new(NullPlayer),
                selector: Arc::new(NullSelector),
            },
            registry,
            workers,
            previews,
        }
    }
}

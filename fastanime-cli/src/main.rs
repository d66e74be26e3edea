//! Binary entry point: config + logging bring-up, wiring every
//! collaborator the session engine needs, then running the stack-based
//! menu loop to completion. Ported from `strev-cli`'s `main.rs` shape
//! (parse args, init logging, load config, build + run), minus that
//! binary's subcommand surface — this workspace has exactly one thing to
//! run: the session engine.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use fastanime_core::collaborators::stub::{NullAnimeProvider, NullMediaApiClient, NullPlayer, NullSelector};
use fastanime_core::collaborators::Collaborators;
use fastanime_core::config::{AppDirs, Config};
use fastanime_preview::PreviewCache;
use fastanime_registry::RegistryStore;
use fastanime_session::{
    EngineContext, ResumeSource, SessionEngineBuilder, SessionPaths, EPISODES, MAIN_MENU, MEDIA_ACTIONS,
    SEARCH_RESULTS, SERVERS,
};
use fastanime_session::handlers::{EpisodesHandler, MainMenuHandler, MediaActionsHandler, SearchResultsHandler, ServersHandler};
use fastanime_workers::ThreadManager;
use tracing::{info, warn};

/// Interactive anime browsing/streaming/downloading session shell.
#[derive(Debug, Parser)]
#[command(name = "fastanime", version, about)]
struct Args {
    /// Path to a TOML config file. Defaults to the platform config dir.
    #[arg(long, env = "FASTANIME_CONFIG")]
    config: Option<PathBuf>,

    /// Override the platform data directory (session snapshots, registry).
    #[arg(long, env = "FASTANIME_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Override the platform cache directory (preview images/info).
    #[arg(long, env = "FASTANIME_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Resume from a specific session snapshot instead of the most recent one.
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Skip resume entirely and start at the main menu.
    #[arg(long)]
    fresh: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    fastanime_core::logging::init(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        tracing::error!("fastanime exited with an error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;

    let dirs = AppDirs::resolve();
    let data_dir = args
        .data_dir
        .or_else(|| dirs.as_ref().map(|d| d.data.clone()))
        .unwrap_or_else(|| PathBuf::from(".fastanime/data"));
    let cache_dir = args
        .cache_dir
        .or_else(|| dirs.as_ref().map(|d| d.cache.clone()))
        .unwrap_or_else(|| PathBuf::from(".fastanime/cache"));
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(&cache_dir)?;

    let registry = Arc::new(RegistryStore::open(&data_dir)?);
    match fastanime_registry::migrate_if_applicable(&registry, &data_dir) {
        Ok(0) => {}
        Ok(n) => info!(migrated = n, "imported legacy watch history"),
        Err(e) => warn!(error = %e, "legacy watch history migration failed, continuing without it"),
    }

    let workers = Arc::new(ThreadManager::new());
    let previews = Arc::new(PreviewCache::new(
        &cache_dir,
        workers.clone(),
        config.session.worker_pool_width,
        config.session.preview_request_timeout,
    )?);

    let collaborators = Collaborators {
        media_api: Box::new(NullMediaApiClient),
        provider: Box::new(NullAnimeProvider),
        player: Box::new(NullPlayer),
        selector: Arc::new(NullSelector),
    };

    let context = EngineContext {
        config,
        config_path: args.config.clone(),
        collaborators,
        registry,
        workers,
        previews,
    };

    let paths = SessionPaths::under(&data_dir);
    let resume = if args.fresh {
        None
    } else if let Some(path) = args.resume {
        Some(ResumeSource::Path(path))
    } else {
        Some(ResumeSource::MostRecent)
    };

    let engine = SessionEngineBuilder::new()
        .register_handler(MAIN_MENU, Box::new(MainMenuHandler))
        .register_handler(SEARCH_RESULTS, Box::new(SearchResultsHandler))
        .register_handler(MEDIA_ACTIONS, Box::new(MediaActionsHandler))
        .register_handler(EPISODES, Box::new(EpisodesHandler))
        .register_handler(SERVERS, Box::new(ServersHandler))
        .build(context, paths, resume)
        .await?;

    engine.run().await?;
    Ok(())
}

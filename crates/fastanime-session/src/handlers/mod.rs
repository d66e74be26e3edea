//! The five concrete menu handlers: enough of the real menu graph
//! (main -> search results -> media actions -> episodes -> servers) to
//! exercise push/pop/MAIN/RELOAD/CONFIG_EDIT/EXIT end-to-end, leaving
//! actual provider scraping and player IPC as trait calls into the
//! collaborators this crate is handed at construction.

mod episodes;
mod main;
mod media_actions;
mod search_results;
mod servers;

pub use episodes::EpisodesHandler;
pub use main::MainMenuHandler;
pub use media_actions::MediaActionsHandler;
pub use search_results::SearchResultsHandler;
pub use servers::ServersHandler;

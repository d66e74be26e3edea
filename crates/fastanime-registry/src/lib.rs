//! Unified media registry: the single source of truth for what has been
//! downloaded and watched, replacing the upstream project's split
//! download-tracker / watch-history files with one record per anime.

mod error;
mod lru;
mod migration;
mod models;
mod store;
mod tracker;

pub use error::{RegistryError, RegistryResult};
pub use migration::{migrate_if_applicable, LEGACY_FILE_NAME};
pub use models::{
    DownloadQueueItem, DownloadStatus, EpisodeStatus, IndexEntry, MediaRecord, MediaUserStatus,
    RegistryIndex, UserMediaData, WatchStatus,
};
pub use store::{ListFilter, RegistryStore, VerifyOutcome};
pub use tracker::RegistryTracker;

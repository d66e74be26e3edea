//! Disk-cached previews (cover images and rendered info text), prefetched
//! through a pair of worker pools sharing one HTTP client.

mod cache;
mod error;

pub use cache::{episode_key, media_key, PreviewCache};
pub use error::{PreviewError, PreviewResult};

//! Error taxonomy shared by every core subsystem.
//!
//! Mirrors the kinds enumerated in the design: each subsystem crate defines
//! its own narrow error enum and feeds it into [`CoreError`] at the
//! boundary the engine actually crosses, the same shape the teacher repo
//! uses for its per-crate `DownloadError` feeding a wider `anyhow` chain.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    IoPlain(#[from] std::io::Error),

    #[error("record at `{path}` is corrupt: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("registry index is corrupt: {reason}")]
    CorruptIndex { reason: String },

    #[error("no handler registered for menu `{0}`")]
    UnknownMenu(String),

    #[error("worker pool `{0}` is not running")]
    NotRunning(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("external collaborator failed: {0}")]
    ExternalFailure(String),

    #[error("JSON (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt_record(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt_index(reason: impl Into<String>) -> Self {
        Self::CorruptIndex {
            reason: reason.into(),
        }
    }

    pub fn external(reason: impl Into<String>) -> Self {
        Self::ExternalFailure(reason.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

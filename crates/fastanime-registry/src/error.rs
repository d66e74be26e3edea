use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("I/O error at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record `{media_id}` is corrupt: {reason}")]
    CorruptRecord { media_id: i64, reason: String },

    #[error("registry index is corrupt: {reason}")]
    CorruptIndex { reason: String },

    #[error("no record found for media `{0}`")]
    NotFound(i64),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] fastanime_core::error::CoreError),
}

impl RegistryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

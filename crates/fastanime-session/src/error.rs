#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Core(#[from] fastanime_core::error::CoreError),

    #[error(transparent)]
    Registry(#[from] fastanime_registry::RegistryError),

    #[error(transparent)]
    Worker(#[from] fastanime_workers::WorkerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown menu `{0}`")]
    UnknownMenu(String),

    #[error("handler `{menu_tag}` failed: {reason}")]
    HandlerFailed { menu_tag: String, reason: String },
}

pub type SessionResult<T> = Result<T, SessionError>;

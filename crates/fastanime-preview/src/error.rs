#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error(transparent)]
    Core(#[from] fastanime_core::error::CoreError),

    #[error(transparent)]
    Worker(#[from] fastanime_workers::WorkerError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub type PreviewResult<T> = Result<T, PreviewError>;

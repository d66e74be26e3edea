use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("pool `{0}` is not running")]
    NotRunning(String),

    #[error("pool `{0}` is already running")]
    AlreadyRunning(String),

    #[error("task was cancelled before it ran")]
    Cancelled,

    #[error("shutdown of pool `{pool}` did not drain within {timeout:?}")]
    ShutdownTimedOut { pool: String, timeout: Duration },

    #[error("task panicked: {0}")]
    Panicked(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

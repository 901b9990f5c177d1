use thiserror::Error;

/// Request-level failures surfaced by the orchestrator
#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing, empty or malformed request; no work was performed
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// The event store could not be read; retry policy belongs to the caller
    #[error("Failed to fetch calendar data: {0}")]
    UpstreamRead(#[source] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Event store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Corrupt event record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Event store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

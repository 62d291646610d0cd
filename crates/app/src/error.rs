use aimg_client::ClientError;
use aimg_core::error::CoreError;
use aimg_store::StoreError;

/// Login and registration failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Rejected locally (e.g. mismatched passwords); the backend was not
    /// contacted.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The backend refused the credentials.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] ClientError),

    /// The session could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors of console operations.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The backend answered `success: false` or a non-2xx status.
    #[error("{0}")]
    Backend(String),

    /// The backend rejected the session; it has been cleared.
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("History entry {0} not found")]
    HistoryEntryNotFound(i64),

    #[error("Saved configuration '{0}' not found")]
    SavedConfigNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for console operation results.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds named in the backend contract.
///
/// `BackendError` and `BackendUnavailable` carry a human-readable detail
/// string captured from the driver (or the dynamic loader); every other
/// variant is self-describing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid filter at {node}: {reason}")]
    InvalidFilter { node: String, reason: String },

    #[error("no such entry")]
    NoSuchEntry,

    #[error("no more data")]
    NoMoreData,

    #[error("out of memory")]
    OutOfMemory,

    #[error("transient backend condition, retry the same request")]
    RetryLater,

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn backend_error(msg: impl Into<String>) -> Self {
        Self::BackendError(msg.into())
    }
}

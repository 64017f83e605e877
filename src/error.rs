//! Error types for merge-chain

use thiserror::Error;

/// Errors raised by the merge chain and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// The merge backend raised during a merge
    ///
    /// Displays as the bare backend message so it can be surfaced verbatim
    /// in `Error: <message>` result pairs.
    #[error("{0}")]
    Backend(String),

    /// The merge backend returned a message we could not interpret
    #[error("unexpected merge backend response: {0}")]
    BackendResponse(String),

    /// Checkpoint registry lookup or registration failed
    #[error("checkpoint registry error: {0}")]
    Registry(String),

    /// Merge method name not in the supported set
    #[error("unknown merge method: {0}")]
    UnknownMethod(String),

    /// Chain file could not be read or parsed
    #[error("chain file error: {0}")]
    Sheet(String),

    /// Application configuration problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Merge history could not be loaded or saved
    #[error("merge history error: {0}")]
    History(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;

//! Connection-level error types.

use thiserror::Error;

use super::command::CommandError;

/// Errors returned by [`Connection`](super::Connection) operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Opening, reading from or writing to the transport failed.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The command could not be encoded.
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("connection already started")]
    AlreadyConnected,

    #[error("connection not started")]
    NotConnected,

    #[error("connection closed")]
    Closed,
}

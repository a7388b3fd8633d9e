//! Error types for generation and simulation.

use thiserror::Error;

/// Result type for generation and simulation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the terrain generator, entity lifecycle and scheduler.
///
/// Storage errors pass through untouched so callers can still tell a
/// `Conflict` from a `NotFound` or an `Inconsistency`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] tilecraft_storage::Error),

    /// A semantic precondition was violated.
    #[error("factory error: {0}")]
    Factory(String),

    /// A pool worker panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Transport status an API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Store(e) => e.status_code(),
            Error::Factory(_) => 400,
            Error::Worker(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Store(tilecraft_storage::Error::NotFound(_)))
    }
}

fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}

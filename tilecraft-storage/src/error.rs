//! Error types for document storage.

use crate::address::Address;
use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Error)]
pub enum Error {
    /// No document at the address, or its parent container is missing.
    #[error("not found: {0}")]
    NotFound(Address),

    /// A document already occupies the address.
    #[error("conflict: a document already exists at {0}")]
    Conflict(Address),

    /// The stored nonce differs from the one expected.
    #[error("inconsistency at {address}: expected nonce {expected}, found {found}")]
    Inconsistency {
        address: Address,
        expected: String,
        found: String,
    },

    /// The address does not resolve to the requested document kind.
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Transport status an API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Inconsistency { .. }
            | Error::UnknownAddress(_)
            | Error::Serialization(_)
            | Error::Io(_) => 500,
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

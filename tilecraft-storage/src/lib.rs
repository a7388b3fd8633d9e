//! Address-keyed document persistence with optimistic concurrency.
//!
//! Every document lives at an [`Address`] and is stored wrapped together with
//! a [`Nonce`]. Each successful write produces a fresh nonce and is verified by
//! re-reading it after the flush; `put` additionally compares the caller's
//! nonce against the stored one before replacing anything.

use async_trait::async_trait;

pub mod address;
pub mod document;
pub mod error;
pub mod file;
pub mod merge;

pub use address::{Address, DocumentKind};
pub use document::{Document, Nonce, WrappedDocument};
pub use error::{Error, Result};
pub use file::{FileBackend, FileStore};

/// Persistence for a single document kind.
///
/// Implementations serialize concurrent writers to the same address so the
/// post-write nonce verification stays meaningful. There is no cross-document
/// transaction.
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    /// Load the document at `address`.
    async fn get(&self, address: &Address) -> Result<WrappedDocument<T>>;

    /// Create a document. Fails with `Conflict` when the address is taken and
    /// `NotFound` when the parent container is missing.
    async fn post(&self, address: &Address, data: T) -> Result<WrappedDocument<T>>;

    /// Deep-merge `partial` into the existing document.
    async fn patch(&self, address: &Address, partial: serde_json::Value) -> Result<WrappedDocument<T>>;

    /// Replace the document. The supplied nonce must match the stored one.
    async fn put(&self, address: &Address, document: WrappedDocument<T>) -> Result<WrappedDocument<T>>;

    /// Remove the document and everything beneath it.
    async fn delete(&self, address: &Address) -> Result<()>;

    /// Addresses of the documents of this kind directly beneath `parent`.
    async fn list(&self, parent: Option<&Address>) -> Result<Vec<Address>>;
}

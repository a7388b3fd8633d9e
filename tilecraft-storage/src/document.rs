//! Stored document envelope.

use crate::address::DocumentKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A record that can be persisted by a [`DocumentStore`](crate::DocumentStore).
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind of address this document lives at.
    const KIND: DocumentKind;
}

/// Opaque token identifying one successful write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit of storage: document data plus the nonce of the write that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedDocument<T> {
    pub data: T,
    pub nonce: Nonce,
}

impl<T> WrappedDocument<T> {
    pub fn new(data: T, nonce: Nonce) -> Self {
        Self { data, nonce }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        let a = Nonce::generate();
        let b = Nonce::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_envelope_layout() {
        let doc = WrappedDocument::new(serde_json::json!({ "name": "w" }), Nonce("abc".to_string()));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, serde_json::json!({ "data": { "name": "w" }, "nonce": "abc" }));
    }
}

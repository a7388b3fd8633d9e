use crate::address::{Address, DocumentKind};
use crate::document::{Document, Nonce, WrappedDocument};
use crate::error::{Error, Result};
use crate::merge::deep_merge;
use crate::DocumentStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tilecraft_benchmark::BenchmarkMetrics;
use tokio::io::AsyncWriteExt;
use tokio::sync::OwnedMutexGuard;

/// Filesystem storage shared by every document kind.
///
/// Documents are JSON files at `{root}/worlds/{w}/chunks/{c}/.../metadata.json`.
/// Writers to one address are serialized by a per-address async mutex held
/// across the whole read-modify-write-verify sequence.
pub struct FileBackend {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    metrics: Arc<BenchmarkMetrics>,
}

impl FileBackend {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Arc<Self>> {
        Self::open_with_metrics(root, Arc::new(BenchmarkMetrics::default())).await
    }

    pub async fn open_with_metrics(
        root: impl Into<PathBuf>,
        metrics: Arc<BenchmarkMetrics>,
    ) -> Result<Arc<Self>> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(DocumentKind::World.segment())).await?;
        log::debug!("Opened document store at {}", root.display());
        Ok(Arc::new(Self {
            root,
            locks: Mutex::new(HashMap::new()),
            metrics,
        }))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metrics(&self) -> &Arc<BenchmarkMetrics> {
        &self.metrics
    }

    /// Typed view over this backend for one document kind.
    pub fn store<T: Document>(self: &Arc<Self>) -> FileStore<T> {
        FileStore {
            backend: Arc::clone(self),
            _kind: PhantomData,
        }
    }

    /// Hold the writer lock for one document directory until the guard drops.
    async fn lock_address(&self, directory: PathBuf) -> AddressGuard<'_> {
        let entry = Arc::clone(self.locks.lock().entry(directory.clone()).or_default());
        AddressGuard {
            backend: self,
            directory,
            guard: Some(entry.lock_owned().await),
        }
    }

    async fn exists(&self, address: &Address) -> Result<bool> {
        Ok(tokio::fs::try_exists(address.metadata_path(&self.root)?).await?)
    }

    async fn require_parent(&self, address: &Address) -> Result<()> {
        if let Some(parent) = address.parent() {
            if !self.exists(&parent).await? {
                return Err(Error::NotFound(parent));
            }
        }
        Ok(())
    }

    async fn read<T: Document>(&self, address: &Address) -> Result<Option<WrappedDocument<T>>> {
        let start = Instant::now();
        let path = address.metadata_path(&self.root)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document = serde_json::from_slice(&bytes)?;
        self.metrics.record_load(start.elapsed());
        Ok(Some(document))
    }

    /// Write `data` under a fresh nonce, flush it, then read it back and
    /// require the nonce to survive.
    async fn write_verified<T: Document>(
        &self,
        address: &Address,
        data: T,
    ) -> Result<WrappedDocument<T>> {
        let start = Instant::now();
        let directory = address.directory(&self.root)?;
        let path = address.metadata_path(&self.root)?;
        let nonce = Nonce::generate();
        let bytes = serde_json::to_vec_pretty(&WrappedDocument::new(data, nonce.clone()))?;

        tokio::fs::create_dir_all(&directory).await?;
        let staging = directory.join(format!(".metadata.{nonce}.tmp"));
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staging, &path).await?;
        self.metrics.record_save(start.elapsed());

        let stored: WrappedDocument<T> = self
            .read(address)
            .await?
            .ok_or_else(|| Error::NotFound(address.clone()))?;
        if stored.nonce != nonce {
            self.metrics.record_inconsistency();
            log::warn!("Write to {address} was clobbered during verification");
            return Err(Error::Inconsistency {
                address: address.clone(),
                expected: nonce.to_string(),
                found: stored.nonce.to_string(),
            });
        }
        Ok(stored)
    }
}

/// Releases its address lock on drop, and forgets the lock entry once no
/// other writer holds or waits on it.
struct AddressGuard<'a> {
    backend: &'a FileBackend,
    directory: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AddressGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Entries are only cloned under the map lock, so a count of one
        // cannot grow while we hold it.
        let mut locks = self.backend.locks.lock();
        if locks
            .get(&self.directory)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&self.directory);
        }
    }
}

/// [`DocumentStore`] for one document kind on top of a [`FileBackend`].
pub struct FileStore<T> {
    backend: Arc<FileBackend>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for FileStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _kind: PhantomData,
        }
    }
}

fn parent_kind(kind: DocumentKind) -> Option<DocumentKind> {
    match kind {
        DocumentKind::World => None,
        DocumentKind::Chunk => Some(DocumentKind::World),
        DocumentKind::Tile => Some(DocumentKind::Chunk),
        DocumentKind::Entity => Some(DocumentKind::Tile),
    }
}

#[async_trait]
impl<T: Document> DocumentStore<T> for FileStore<T> {
    async fn get(&self, address: &Address) -> Result<WrappedDocument<T>> {
        address.expect_kind(T::KIND)?;
        self.backend
            .read(address)
            .await?
            .ok_or_else(|| Error::NotFound(address.clone()))
    }

    async fn post(&self, address: &Address, data: T) -> Result<WrappedDocument<T>> {
        address.expect_kind(T::KIND)?;
        let _guard = self.backend.lock_address(address.directory(self.backend.root())?).await;

        if self.backend.exists(address).await? {
            return Err(Error::Conflict(address.clone()));
        }
        self.backend.require_parent(address).await?;
        log::trace!("post {address}");
        self.backend.write_verified(address, data).await
    }

    async fn patch(&self, address: &Address, partial: serde_json::Value) -> Result<WrappedDocument<T>> {
        address.expect_kind(T::KIND)?;
        let _guard = self.backend.lock_address(address.directory(self.backend.root())?).await;

        let existing: WrappedDocument<T> = self
            .backend
            .read(address)
            .await?
            .ok_or_else(|| Error::NotFound(address.clone()))?;
        let mut merged = serde_json::to_value(existing.data)?;
        deep_merge(&mut merged, partial);
        let data: T = serde_json::from_value(merged)?;
        log::trace!("patch {address}");
        self.backend.write_verified(address, data).await
    }

    async fn put(&self, address: &Address, document: WrappedDocument<T>) -> Result<WrappedDocument<T>> {
        address.expect_kind(T::KIND)?;
        let _guard = self.backend.lock_address(address.directory(self.backend.root())?).await;

        match self.backend.read::<T>(address).await? {
            Some(existing) if existing.nonce != document.nonce => {
                self.backend.metrics.record_inconsistency();
                return Err(Error::Inconsistency {
                    address: address.clone(),
                    expected: document.nonce.to_string(),
                    found: existing.nonce.to_string(),
                });
            }
            Some(_) => {}
            None => self.backend.require_parent(address).await?,
        }
        log::trace!("put {address}");
        self.backend.write_verified(address, document.data).await
    }

    async fn delete(&self, address: &Address) -> Result<()> {
        address.expect_kind(T::KIND)?;
        let directory = address.directory(self.backend.root())?;
        let _guard = self.backend.lock_address(directory.clone()).await;

        if !self.backend.exists(address).await? {
            return Err(Error::NotFound(address.clone()));
        }
        tokio::fs::remove_dir_all(&directory).await?;
        log::debug!("Deleted {address}");
        Ok(())
    }

    async fn list(&self, parent: Option<&Address>) -> Result<Vec<Address>> {
        let directory = match (parent_kind(T::KIND), parent) {
            (None, None) => self.backend.root().join(DocumentKind::World.segment()),
            (Some(kind), Some(parent)) => {
                parent.expect_kind(kind)?;
                if !self.backend.exists(parent).await? {
                    return Err(Error::NotFound(parent.clone()));
                }
                parent.directory(self.backend.root())?.join(T::KIND.segment())
            }
            _ => {
                return Err(Error::UnknownAddress(format!(
                    "cannot list {} documents under {}",
                    T::KIND,
                    parent.map_or_else(|| "the root".to_string(), ToString::to_string)
                )));
            }
        };

        let mut entries = match tokio::fs::read_dir(&directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut addresses = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(id) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let address = match parent {
                None => Address::world(id),
                Some(parent) => match T::KIND {
                    DocumentKind::Chunk => parent.with_chunk(id),
                    DocumentKind::Tile => parent.with_tile(id),
                    _ => parent.with_entity(id),
                },
            };
            if address.kind().is_ok() && self.backend.exists(&address).await? {
                addresses.push(address);
            }
        }
        addresses.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(addresses)
    }
}

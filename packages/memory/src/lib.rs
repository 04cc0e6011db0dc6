//! In-memory reference backend.
//!
//! Behaves like an object store: blobs are flat keys, folders exist only by
//! implication from deeper keys. Listing is single-level, so a router wraps
//! this backend with its traversal engine for recursive queries - which
//! makes `MemoryStore` the fixture of choice for exercising that engine.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tokio::sync::RwLock;

use omnistore_core::{Blob, BlobKind, ListOptions, Path, StorageBackend, StoreError};

struct Entry {
    data: Bytes,
    blob: Blob,
}

/// An in-memory store keyed by blob path.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use omnistore_core::{path, ListOptions, StorageBackend};
/// use omnistore_memory::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// store.write(&path!("greeting"), Bytes::from_static(b"hello"), false).await.unwrap();
///
/// let data = store.open_read(&path!("greeting")).await.unwrap().unwrap();
/// assert_eq!(&data[..], b"hello");
/// # });
/// ```
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Path, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn list(&self, options: &ListOptions) -> Result<Vec<Blob>, StoreError> {
        options.validate()?;
        let entries = self.entries.read().await;
        let folder = &options.folder_path;

        let mut subfolders = BTreeSet::new();
        let mut files = Vec::new();
        for (path, entry) in entries.iter() {
            let Some(rest) = path.strip_prefix(folder) else {
                continue;
            };
            if rest.is_root() {
                continue;
            }
            if rest.len() == 1 {
                let mut blob = entry.blob.clone();
                if !options.include_attributes {
                    blob.clear_attributes();
                }
                files.push(blob);
            } else {
                // a deeper key implies this subfolder
                subfolders.insert(rest.segments()[0].clone());
            }
        }

        let rows = subfolders
            .into_iter()
            .map(|name| Blob::new(folder.clone(), name, BlobKind::Folder))
            .chain(files)
            .filter(|blob| options.is_match(blob) && options.passes_filter(blob));

        let mut results = Vec::new();
        options.add(&mut results, rows);
        Ok(results)
    }

    async fn write(&self, path: &Path, data: Bytes, append: bool) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        match entries.get_mut(path) {
            Some(entry) if append => {
                let mut combined = BytesMut::with_capacity(entry.data.len() + data.len());
                combined.extend_from_slice(&entry.data);
                combined.extend_from_slice(&data);
                entry.data = combined.freeze();
                entry.blob.size = Some(entry.data.len() as u64);
                entry.blob.modified = Some(now);
            }
            Some(entry) => {
                entry.data = data;
                entry.blob.size = Some(entry.data.len() as u64);
                entry.blob.modified = Some(now);
            }
            None => {
                let mut blob = Blob::from_path(path, BlobKind::File);
                blob.size = Some(data.len() as u64);
                blob.created = Some(now);
                blob.modified = Some(now);
                entries.insert(path.clone(), Entry { data, blob });
            }
        }
        Ok(())
    }

    async fn open_read(&self, path: &Path) -> Result<Option<Bytes>, StoreError> {
        Ok(self.entries.read().await.get(path).map(|e| e.data.clone()))
    }

    async fn delete(&self, paths: &[Path]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for path in paths {
            entries.remove(path);
        }
        Ok(())
    }

    async fn exists(&self, paths: &[Path]) -> Result<Vec<bool>, StoreError> {
        let entries = self.entries.read().await;
        Ok(paths.iter().map(|p| entries.contains_key(p)).collect())
    }

    async fn get_blobs(&self, paths: &[Path]) -> Result<Vec<Option<Blob>>, StoreError> {
        let entries = self.entries.read().await;
        Ok(paths
            .iter()
            .map(|p| entries.get(p).map(|e| e.blob.clone()))
            .collect())
    }

    async fn set_blobs(&self, blobs: &[Blob]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for update in blobs {
            let path = update.full_path();
            let entry = entries
                .get_mut(&path)
                .ok_or_else(|| StoreError::NotFound(path.clone()))?;
            // metadata-only update: location, size and payload are untouched
            entry.blob.clear_attributes();
            for (key, value) in update.metadata() {
                entry.blob.set_metadata(key, value.clone());
            }
            for (key, value) in update.properties() {
                entry.blob.set_property(key, value.clone());
            }
            entry.blob.content_hash = update.content_hash.clone();
            entry.blob.modified = Some(Utc::now());
        }
        Ok(())
    }
}

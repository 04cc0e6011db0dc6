//! The blob entity: one file or folder node in the virtual namespace.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attrs;
use crate::error::StoreError;
use crate::path::Path;

/// Whether a blob is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    File,
    Folder,
}

/// Opaque handle for a registered mount.
///
/// A mount table assigns these at registration time; a blob may carry one
/// while a batched call is being routed. The association is weak and never
/// persisted - it is skipped during serialization and not part of blob
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(u32);

impl MountId {
    pub fn new(index: u32) -> Self {
        MountId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node (file or folder) of the virtual namespace.
///
/// Blobs are transient value objects: a request payload going into a
/// backend, or a response row coming out of one. Equality and hashing are
/// defined by `(full_path, kind)` only; sizes, timestamps and attributes do
/// not participate.
///
/// The `properties` and `metadata` maps treat keys case-insensitively by
/// lowercasing them on every access, and iterate in sorted key order.
///
/// # Examples
///
/// ```rust
/// use omnistore_core::{path, Blob, BlobKind};
///
/// let blob = Blob::from_path(&path!("/docs/readme.txt"), BlobKind::File);
/// assert_eq!(blob.folder_path(), &path!("/docs"));
/// assert_eq!(blob.name(), "readme.txt");
/// assert_eq!(blob.full_path(), path!("/docs/readme.txt"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    kind: BlobKind,
    folder_path: Path,
    name: String,
    pub size: Option<u64>,
    pub content_hash: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    properties: BTreeMap<String, serde_json::Value>,
    metadata: BTreeMap<String, String>,
    #[serde(skip)]
    backend: Option<MountId>,
}

impl Blob {
    /// Construct from a folder path and a name, stored as given.
    pub fn new(folder_path: Path, name: impl Into<String>, kind: BlobKind) -> Self {
        Blob {
            kind,
            folder_path,
            name: name.into(),
            size: None,
            content_hash: None,
            created: None,
            modified: None,
            properties: BTreeMap::new(),
            metadata: BTreeMap::new(),
            backend: None,
        }
    }

    /// Construct from a full path, decomposing it into folder and name.
    ///
    /// The root path maps to the (root, `""`) pair.
    pub fn from_path(full_path: &Path, kind: BlobKind) -> Self {
        Blob::new(full_path.parent(), full_path.name(), kind)
    }

    /// Shorthand for a file node at `full_path`.
    pub fn file(full_path: &Path) -> Self {
        Blob::from_path(full_path, BlobKind::File)
    }

    /// Shorthand for a folder node at `full_path`.
    pub fn folder(full_path: &Path) -> Self {
        Blob::from_path(full_path, BlobKind::Folder)
    }

    pub fn kind(&self) -> BlobKind {
        self.kind
    }

    pub fn is_folder(&self) -> bool {
        self.kind == BlobKind::Folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    /// The combined `folder_path / name`.
    pub fn full_path(&self) -> Path {
        self.folder_path.child(&self.name)
    }

    /// Re-decompose `path` into this blob's folder and name.
    ///
    /// Only the location fields change; sizes, timestamps and attributes
    /// stay as they are.
    pub fn set_full_path(&mut self, path: &Path) {
        self.folder_path = path.parent();
        self.name = path.name().to_string();
    }

    /// Re-home this blob under `prefix` by prepending it to the folder path.
    ///
    /// Used when a backend-local result row is lifted back into the virtual
    /// namespace. A root prefix is a no-op.
    pub fn prepend_path(&mut self, prefix: &Path) {
        if prefix.is_root() {
            return;
        }
        self.folder_path = prefix.join(&self.folder_path);
    }

    /// Look up a free-form property. Keys are case-insensitive.
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(&key.to_lowercase())
    }

    /// Set a free-form property. Keys are case-insensitive.
    pub fn set_property(&mut self, key: &str, value: serde_json::Value) {
        self.properties.insert(key.to_lowercase(), value);
    }

    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    /// Look up a user metadata entry. Keys are case-insensitive.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Set a user metadata entry. Keys are case-insensitive.
    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_lowercase(), value.into());
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Drop both attribute maps, for listings that omit attributes.
    pub fn clear_attributes(&mut self) {
        self.properties.clear();
        self.metadata.clear();
    }

    /// Serialize the metadata map to the versioned attribute byte format.
    pub fn encode_metadata(&self) -> Bytes {
        attrs::encode_metadata(&self.metadata)
    }

    /// Merge a serialized attribute buffer into the metadata map, key by key.
    pub fn apply_metadata_bytes(&mut self, buf: &[u8]) -> Result<(), StoreError> {
        let mut decoded = BTreeMap::new();
        attrs::decode_metadata(buf, &mut decoded)?;
        for (key, value) in decoded {
            self.set_metadata(&key, value);
        }
        Ok(())
    }

    /// The transient mount association, if a router stamped one.
    pub fn backend(&self) -> Option<MountId> {
        self.backend
    }

    pub fn set_backend(&mut self, backend: Option<MountId>) {
        self.backend = backend;
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.full_path() == other.full_path()
    }
}

impl Eq for Blob {}

impl Hash for Blob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.full_path().hash(state);
    }
}

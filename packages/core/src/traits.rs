//! The storage capability interface every backend implements.

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::Blob;
use crate::error::StoreError;
use crate::options::ListOptions;
use crate::path::Path;

/// The contract a storage backend satisfies so a router can treat it
/// uniformly: cloud object stores, local disks, archives and in-memory
/// stores all sit behind this one trait.
///
/// Paths given to a backend are in the backend's own coordinate space; a
/// router strips its mount prefix before delegating and re-homes result
/// rows afterwards.
///
/// # Object Safety
///
/// The trait is object-safe and is normally consumed as
/// `Arc<dyn StorageBackend>`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List blobs according to `options`.
    ///
    /// A backend may implement only single-level listing (direct children
    /// of `options.folder_path`); callers that need recursion check
    /// [`StorageBackend::supports_recursion`] and wrap with a traversal
    /// engine when it returns false.
    async fn list(&self, options: &ListOptions) -> Result<Vec<Blob>, StoreError>;

    /// Whether [`StorageBackend::list`] honors `options.recurse` natively.
    fn supports_recursion(&self) -> bool {
        false
    }

    /// Write `data` at `path`, creating or replacing the blob, or appending
    /// to it when `append` is set.
    async fn write(&self, path: &Path, data: Bytes, append: bool) -> Result<(), StoreError>;

    /// Read the blob at `path`.
    ///
    /// `None` means not found; that is not an error.
    async fn open_read(&self, path: &Path) -> Result<Option<Bytes>, StoreError>;

    /// Delete every listed blob. Missing blobs are skipped silently.
    async fn delete(&self, paths: &[Path]) -> Result<(), StoreError>;

    /// Existence flags, positionally aligned with `paths`.
    async fn exists(&self, paths: &[Path]) -> Result<Vec<bool>, StoreError>;

    /// Blob rows, positionally aligned with `paths`; `None` for misses.
    async fn get_blobs(&self, paths: &[Path]) -> Result<Vec<Option<Blob>>, StoreError>;

    /// Metadata-only update of the listed blobs.
    async fn set_blobs(&self, blobs: &[Blob]) -> Result<(), StoreError>;

    /// Begin a transaction. Backends without transactional semantics get
    /// the no-op handle.
    fn open_transaction(&self) -> Box<dyn StoreTransaction> {
        Box::new(NoopTransaction)
    }
}

/// Handle for a backend transaction.
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Transaction handle for backends without transactional semantics.
pub struct NoopTransaction;

#[async_trait]
impl StoreTransaction for NoopTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

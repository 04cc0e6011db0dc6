//! omnistore: one hierarchical namespace over many storage backends.
//!
//! Heterogeneous backends - cloud object stores, local disks, archives,
//! in-memory stores - are mounted at virtual path prefixes and served
//! through a single routing layer. Paths resolve to the most specific
//! mount, operations fan out across backends in batched concurrent calls,
//! and results are reassembled in the caller's view of the namespace.
//!
//! This crate re-exports the layered packages:
//! - [`omnistore_core`]: data model and the backend capability interface
//! - [`omnistore_router`]: mount routing, fan-out, recursive traversal
//! - [`omnistore_memory`]: the in-memory reference backend

pub use omnistore_core::{
    attrs, path, Blob, BlobKind, BrowseFilter, Bytes, ListOptions, MountId, NoopTransaction,
    Path, PathError, StorageBackend, StoreError, StoreTransaction, MAX_PATH_LEN, MAX_PREFIX_LEN,
};
pub use omnistore_memory::MemoryStore;
pub use omnistore_router::{
    list_with_traversal, MountEntry, PathTrie, VirtualStore, DEFAULT_FANOUT_LIMIT,
    MOUNT_POINT_PROPERTY,
};

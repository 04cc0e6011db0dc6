//! Core omnistore: the data model and capability contract of the virtual
//! blob namespace.
//!
//! This layer defines what the routing layer and every backend agree on:
//! - `Path`: normalized `/`-separated virtual paths
//! - `Blob`: one file or folder node, with case-insensitive attribute maps
//! - `ListOptions`: a listing query descriptor with matching and capping
//! - `StorageBackend`: the async capability interface backends implement
//! - the attribute byte format for metadata persisted in backend-native
//!   attribute slots
//!
//! No routing or backend implementation lives here.
//!
//! # Example
//!
//! ```rust
//! use omnistore_core::{path, Blob, BlobKind, ListOptions};
//!
//! let blob = Blob::from_path(&path!("/docs/readme.txt"), BlobKind::File);
//! let options = ListOptions::folder(path!("/docs")).with_prefix("read");
//! assert!(options.is_match(&blob));
//! ```

pub use bytes::Bytes;

pub mod attrs;
mod blob;
mod error;
mod options;
mod path;
mod traits;

pub use blob::{Blob, BlobKind, MountId};
pub use error::StoreError;
pub use options::{BrowseFilter, ListOptions, MAX_PREFIX_LEN};
pub use path::{Path, PathError, MAX_PATH_LEN};
pub use traits::{NoopTransaction, StorageBackend, StoreTransaction};

//! Virtual mount routing for omnistore.
//!
//! This layer aggregates many backends behind one namespace:
//! - `PathTrie`: longest-prefix resolution over path segments
//! - `VirtualStore`: the mount table, batched fan-out and listing
//!   aggregation
//! - `list_with_traversal`: recursive listing for backends that only do
//!   single-level
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use omnistore_core::{path, ListOptions};
//! use omnistore_router::VirtualStore;
//!
//! let mut store = VirtualStore::new();
//! store.mount("/docs", Arc::new(docs_backend))?;
//! store.mount("/media", Arc::new(media_backend))?;
//!
//! let rows = store.list(&ListOptions::root()).await?;
//! ```

mod path_trie;
mod traversal;
mod virtual_store;

pub use path_trie::PathTrie;
pub use traversal::{list_with_traversal, DEFAULT_FANOUT_LIMIT};
pub use virtual_store::{MountEntry, VirtualStore, MOUNT_POINT_PROPERTY};

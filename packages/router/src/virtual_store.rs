//! The virtual mount router.
//!
//! A `VirtualStore` presents many independently-implemented backends as one
//! hierarchical namespace. Backends are anchored at virtual path prefixes;
//! each call resolves its paths to the responsible backend (longest
//! matching prefix wins), rewrites them into that backend's coordinate
//! space, executes, and lifts results back into the caller's view.
//!
//! Registration and serving are two phases: complete all `mount` calls
//! before issuing requests. The borrow checker enforces this - `mount`
//! takes `&mut self` while every serving call takes `&self` - and a
//! finished table is freely shareable for concurrent reads.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use omnistore_core::{
    Blob, BrowseFilter, ListOptions, MountId, Path, StorageBackend, StoreError, StoreTransaction,
};

use crate::path_trie::PathTrie;
use crate::traversal::{self, DEFAULT_FANOUT_LIMIT};

/// Property key flagging a synthesized folder row as an actual mount point.
pub const MOUNT_POINT_PROPERTY: &str = "IsMountPoint";

/// One registered mount: a backend anchored at a virtual path prefix.
pub struct MountEntry {
    prefix: Path,
    backend: Arc<dyn StorageBackend>,
}

impl MountEntry {
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }
}

/// The aggregation router over a table of mounted backends.
///
/// Holds no state across calls apart from the mount table: each call
/// independently resolves, executes and returns.
///
/// # Example
///
/// ```rust,ignore
/// let mut store = VirtualStore::new();
/// store.mount("/docs", Arc::new(MemoryStore::new()))?;
/// store.mount("/media", Arc::new(MemoryStore::new()))?;
///
/// store.write(&path!("/docs/readme.txt"), data, false).await?;
/// let rows = store.list(&ListOptions::root()).await?;
/// ```
pub struct VirtualStore {
    /// Side table of mounts; a `MountId` is an index into it.
    mounts: Vec<MountEntry>,
    /// Prefix trie for longest-prefix path resolution.
    routes: PathTrie<MountId>,
    /// Synthesized folder rows, keyed by their containing folder.
    containers: BTreeMap<Path, Vec<Blob>>,
    fanout_limit: usize,
    cancel: CancellationToken,
}

/// Inputs for one backend's batched call, with their original positions.
struct Batch {
    id: MountId,
    indices: Vec<usize>,
    paths: Vec<Path>,
}

impl VirtualStore {
    pub fn new() -> Self {
        VirtualStore {
            mounts: Vec::new(),
            routes: PathTrie::new(),
            containers: BTreeMap::new(),
            fanout_limit: DEFAULT_FANOUT_LIMIT,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound on concurrent backend calls per recursive traversal.
    pub fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit.max(1);
        self
    }

    /// Token checked at every suspend point; cancelling it aborts in-flight
    /// calls. Backends that already completed their portion of a fan-out
    /// are not rolled back.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Register `backend` at `prefix`. Mounts are append-only for the
    /// lifetime of the router.
    pub fn mount(
        &mut self,
        prefix: &str,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<MountId, StoreError> {
        let prefix = Path::parse(prefix)?;
        Ok(self.mount_at(prefix, backend))
    }

    /// Register `backend` at an already-parsed `prefix`.
    ///
    /// Every ancestor of the prefix gains a synthesized folder row, so
    /// browsing any ancestor reveals the mount as an ordinary subfolder;
    /// the leaf row is additionally flagged with [`MOUNT_POINT_PROPERTY`]
    /// and carries the mount handle.
    pub fn mount_at(&mut self, prefix: Path, backend: Arc<dyn StorageBackend>) -> MountId {
        let id = MountId::new(self.mounts.len() as u32);

        for depth in 1..=prefix.len() {
            let node = prefix.prefix(depth);
            let rows = self.containers.entry(node.parent()).or_default();
            let position = rows.iter().position(|row| row.name() == node.name());
            let row = match position {
                Some(found) => &mut rows[found],
                None => {
                    rows.push(Blob::folder(&node));
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };
            if depth == prefix.len() {
                row.set_property(MOUNT_POINT_PROPERTY, serde_json::Value::Bool(true));
                row.set_backend(Some(id));
            }
        }

        self.routes.insert(&prefix, id);
        debug!(prefix = %prefix, id = id.index(), "registered mount");
        self.mounts.push(MountEntry { prefix, backend });
        id
    }

    pub fn mounts(&self) -> &[MountEntry] {
        &self.mounts
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }

    /// Resolve a virtual path to the responsible mount and the path in that
    /// backend's coordinate space. The longest matching prefix wins; `None`
    /// when no mount covers the path.
    pub fn resolve(&self, path: &Path) -> Option<(MountId, Path)> {
        self.routes.find_ancestor(path).map(|(id, rest)| (*id, rest))
    }

    /// List one folder of the virtual namespace.
    ///
    /// Synthesized mount rows under the folder come first, then rows
    /// delegated to the covering backend; with `recurse` set, mounts below
    /// the folder are traversed too. The `max_results` cap is global across
    /// all contributing mounts.
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<Blob>, StoreError> {
        options.validate()?;
        self.check_cancelled()?;
        let folder = &options.folder_path;
        let mut results = Vec::new();

        // synthesized rows directly under the folder
        if let Some(rows) = self.containers.get(folder) {
            let keep = rows
                .iter()
                .filter(|row| options.is_match(row) && options.passes_filter(row))
                .cloned();
            if options.add(&mut results, keep) {
                return Ok(results);
            }
        }

        // deeper synthesized rows are only visible to recursive listings
        if options.recurse {
            for (container, rows) in &self.containers {
                if container == folder || !container.has_prefix(folder) {
                    continue;
                }
                let keep = rows
                    .iter()
                    .filter(|row| options.is_match(row) && options.passes_filter(row))
                    .cloned();
                if options.add(&mut results, keep) {
                    return Ok(results);
                }
            }
        }

        // the mount covering the folder itself serves the folder's own rows
        if let Some((id, rest)) = self.resolve(folder) {
            let rows = self.delegate_list(id, rest, options).await?;
            if options.add(&mut results, rows) {
                return Ok(results);
            }
        }

        // recursion descends into every mount anchored below the folder
        if options.recurse {
            for index in 0..self.mounts.len() {
                let id = MountId::new(index as u32);
                let prefix = &self.mounts[index].prefix;
                if prefix == folder || !prefix.has_prefix(folder) {
                    continue;
                }
                let rows = self.delegate_list(id, Path::root(), options).await?;
                if options.add(&mut results, rows) {
                    return Ok(results);
                }
            }
        }

        Ok(results)
    }

    /// Delegate a listing into one mount, lifting results back into the
    /// virtual namespace afterwards.
    async fn delegate_list(
        &self,
        id: MountId,
        folder: Path,
        options: &ListOptions,
    ) -> Result<Vec<Blob>, StoreError> {
        let entry = &self.mounts[id.index()];
        let mut sub = options.clone();
        sub.folder_path = folder;
        // the caller's predicate sees virtual-namespace rows, so lift each
        // backend-local candidate before asking it
        sub.browse_filter = options.browse_filter.clone().map(|filter| {
            let prefix = entry.prefix.clone();
            let lifted: BrowseFilter = Arc::new(move |row: &Blob| {
                let mut view = row.clone();
                view.prepend_path(&prefix);
                filter(&view)
            });
            lifted
        });

        let backend = Arc::clone(&entry.backend);
        trace!(mount = id.index(), folder = %sub.folder_path, "delegating list");
        let mut rows = if sub.recurse && !backend.supports_recursion() {
            traversal::list_with_traversal(
                backend,
                &sub,
                self.fanout_limit,
                self.cancel.child_token(),
            )
            .await?
        } else {
            backend.list(&sub).await?
        };

        for row in rows.iter_mut() {
            row.prepend_path(&entry.prefix);
            row.set_backend(Some(id));
        }
        Ok(rows)
    }

    /// Write one blob. An unroutable path is an error, not a silent no-op.
    pub async fn write(&self, path: &Path, data: Bytes, append: bool) -> Result<(), StoreError> {
        self.check_cancelled()?;
        let (id, rest) = self
            .resolve(path)
            .ok_or_else(|| StoreError::NoRoute(path.clone()))?;
        trace!(path = %path, mount = id.index(), "routing write");
        self.mounts[id.index()].backend.write(&rest, data, append).await
    }

    /// Read one blob; `None` when the backend has no blob at the path. An
    /// unroutable path is an error.
    pub async fn open_read(&self, path: &Path) -> Result<Option<Bytes>, StoreError> {
        self.check_cancelled()?;
        let (id, rest) = self
            .resolve(path)
            .ok_or_else(|| StoreError::NoRoute(path.clone()))?;
        trace!(path = %path, mount = id.index(), "routing read");
        self.mounts[id.index()].backend.open_read(&rest).await
    }

    /// Open a transaction on the backend responsible for `path`.
    pub fn open_transaction(&self, path: &Path) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let (id, _) = self
            .resolve(path)
            .ok_or_else(|| StoreError::NoRoute(path.clone()))?;
        Ok(self.mounts[id.index()].backend.open_transaction())
    }

    /// Delete many blobs across backends in one batched fan-out.
    ///
    /// The returned flags are positionally aligned with `paths`: `true`
    /// when the path was routed and its backend's batch succeeded, `false`
    /// for unroutable paths. Unroutable entries never abort the call; a
    /// failing backend fails the whole call.
    pub async fn delete(&self, paths: &[Path]) -> Result<Vec<bool>, StoreError> {
        self.check_cancelled()?;
        let mut slots = vec![false; paths.len()];
        let batches = self.group_paths(paths);
        debug!(inputs = paths.len(), backends = batches.len(), "fanning out delete");

        let mut tasks: JoinSet<Result<Vec<usize>, StoreError>> = JoinSet::new();
        for batch in batches {
            let backend = Arc::clone(&self.mounts[batch.id.index()].backend);
            tasks.spawn(async move {
                backend.delete(&batch.paths).await?;
                Ok(batch.indices)
            });
        }
        self.join_batches(tasks, |indices| {
            for index in indices {
                slots[index] = true;
            }
        })
        .await?;
        Ok(slots)
    }

    /// Existence flags for many blobs, positionally aligned with `paths`.
    /// Unroutable paths report `false`.
    pub async fn exists(&self, paths: &[Path]) -> Result<Vec<bool>, StoreError> {
        self.check_cancelled()?;
        let mut slots = vec![false; paths.len()];
        let batches = self.group_paths(paths);
        debug!(inputs = paths.len(), backends = batches.len(), "fanning out exists");

        let mut tasks: JoinSet<Result<(Vec<usize>, Vec<bool>), StoreError>> = JoinSet::new();
        for batch in batches {
            let backend = Arc::clone(&self.mounts[batch.id.index()].backend);
            tasks.spawn(async move {
                let found = backend.exists(&batch.paths).await?;
                expect_aligned(found.len(), batch.paths.len())?;
                Ok((batch.indices, found))
            });
        }
        self.join_batches(tasks, |(indices, found)| {
            for (index, value) in indices.into_iter().zip(found) {
                slots[index] = value;
            }
        })
        .await?;
        Ok(slots)
    }

    /// Blob rows for many paths, positionally aligned. Unroutable paths and
    /// backend misses report `None`; hits come back in virtual-namespace
    /// coordinates, stamped with their mount handle.
    pub async fn get_blobs(&self, paths: &[Path]) -> Result<Vec<Option<Blob>>, StoreError> {
        self.check_cancelled()?;
        let mut slots: Vec<Option<Blob>> = vec![None; paths.len()];
        let batches = self.group_paths(paths);
        debug!(inputs = paths.len(), backends = batches.len(), "fanning out get_blobs");

        type Gathered = (MountId, Vec<usize>, Vec<Option<Blob>>);
        let mut tasks: JoinSet<Result<Gathered, StoreError>> = JoinSet::new();
        for batch in batches {
            let backend = Arc::clone(&self.mounts[batch.id.index()].backend);
            tasks.spawn(async move {
                let rows = backend.get_blobs(&batch.paths).await?;
                expect_aligned(rows.len(), batch.paths.len())?;
                Ok((batch.id, batch.indices, rows))
            });
        }
        self.join_batches(tasks, |(id, indices, rows): Gathered| {
            let prefix = &self.mounts[id.index()].prefix;
            for (index, row) in indices.into_iter().zip(rows) {
                slots[index] = row.map(|mut blob| {
                    blob.prepend_path(prefix);
                    blob.set_backend(Some(id));
                    blob
                });
            }
        })
        .await?;
        Ok(slots)
    }

    /// Metadata-only update of many blobs, fanned out by resolved backend.
    ///
    /// A blob already stamped with a mount handle skips re-resolution. The
    /// returned flags mark which inputs were routed and applied.
    pub async fn set_blobs(&self, blobs: &[Blob]) -> Result<Vec<bool>, StoreError> {
        self.check_cancelled()?;
        let mut slots = vec![false; blobs.len()];

        let mut batches: BTreeMap<MountId, (Vec<usize>, Vec<Blob>)> = BTreeMap::new();
        for (index, blob) in blobs.iter().enumerate() {
            let full = blob.full_path();
            let stamped = blob.backend().filter(|id| id.index() < self.mounts.len());
            let resolved = match stamped {
                Some(id) => full
                    .strip_prefix(&self.mounts[id.index()].prefix)
                    .map(|rest| (id, rest)),
                None => None,
            }
            .or_else(|| self.resolve(&full));
            let Some((id, rest)) = resolved else {
                trace!(path = %full, "no mount covers blob");
                continue;
            };

            let mut local = blob.clone();
            local.set_full_path(&rest);
            local.set_backend(None);
            let (indices, rows) = batches.entry(id).or_default();
            indices.push(index);
            rows.push(local);
        }
        debug!(inputs = blobs.len(), backends = batches.len(), "fanning out set_blobs");

        let mut tasks: JoinSet<Result<Vec<usize>, StoreError>> = JoinSet::new();
        for (id, (indices, rows)) in batches {
            let backend = Arc::clone(&self.mounts[id.index()].backend);
            tasks.spawn(async move {
                backend.set_blobs(&rows).await?;
                Ok(indices)
            });
        }
        self.join_batches(tasks, |indices| {
            for index in indices {
                slots[index] = true;
            }
        })
        .await?;
        Ok(slots)
    }

    /// Group routable inputs by resolved backend, remembering original
    /// positions for the gather phase.
    fn group_paths(&self, paths: &[Path]) -> Vec<Batch> {
        let mut batches: BTreeMap<MountId, Batch> = BTreeMap::new();
        for (index, path) in paths.iter().enumerate() {
            let Some((id, rest)) = self.resolve(path) else {
                trace!(path = %path, "no mount covers path");
                continue;
            };
            let batch = batches.entry(id).or_insert_with(|| Batch {
                id,
                indices: Vec::new(),
                paths: Vec::new(),
            });
            batch.indices.push(index);
            batch.paths.push(rest);
        }
        batches.into_values().collect()
    }

    /// Await every backend task, scattering each result as it lands.
    /// All-or-nothing: the first backend failure fails the aggregate call
    /// (dropping the set aborts the rest), and cancellation wins over
    /// pending joins.
    async fn join_batches<T: 'static>(
        &self,
        mut tasks: JoinSet<Result<T, StoreError>>,
        mut scatter: impl FnMut(T),
    ) -> Result<(), StoreError> {
        loop {
            let joined = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return Err(StoreError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            match joined {
                None => return Ok(()),
                Some(Ok(result)) => scatter(result?),
                Some(Err(join_err)) if join_err.is_cancelled() => continue,
                Some(Err(join_err)) => return Err(StoreError::backend(join_err)),
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }
}

impl Default for VirtualStore {
    fn default() -> Self {
        Self::new()
    }
}

fn expect_aligned(got: usize, want: usize) -> Result<(), StoreError> {
    if got != want {
        return Err(StoreError::backend(format!(
            "backend answered {got} rows for {want} paths"
        )));
    }
    Ok(())
}

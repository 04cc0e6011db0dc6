//! Generic recursive listing traversal.
//!
//! Turns a backend's single-level listing primitive into full recursive,
//! filtered, capped traversal: every backend gets recursion for free. One
//! concurrent branch runs per subfolder, bounded by a semaphore; the result
//! cap is global across the whole traversal, not per branch.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use omnistore_core::{Blob, ListOptions, Path, StorageBackend, StoreError};

/// Default bound on concurrently listed folders within one traversal.
pub const DEFAULT_FANOUT_LIMIT: usize = 16;

/// List `options.folder_path` on `backend`, recursing when asked.
///
/// The backend only needs single-level listing. Subfolders found at each
/// level are walked concurrently with their siblings, all branches sharing
/// one accumulator and one `max_results` cap; at most `max_in_flight`
/// backend calls run at a time. A failure on any folder fails the whole
/// traversal, and cancellation surfaces as [`StoreError::Cancelled`].
pub async fn list_with_traversal(
    backend: Arc<dyn StorageBackend>,
    options: &ListOptions,
    max_in_flight: usize,
    cancel: CancellationToken,
) -> Result<Vec<Blob>, StoreError> {
    options.validate()?;

    if !options.recurse {
        let chunk = backend.list(options).await?;
        let mut results = Vec::new();
        options.add(
            &mut results,
            chunk
                .into_iter()
                .filter(|blob| options.is_match(blob) && options.passes_filter(blob)),
        );
        return Ok(results);
    }

    debug!(folder = %options.folder_path, limit = max_in_flight, "starting recursive traversal");

    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let results = Arc::new(Mutex::new(Vec::new()));
    let mut branches: JoinSet<Result<Vec<Path>, StoreError>> = JoinSet::new();

    spawn_branch(
        &mut branches,
        Arc::clone(&backend),
        options.clone(),
        options.folder_path.clone(),
        Arc::clone(&semaphore),
        Arc::clone(&results),
        cancel.clone(),
    );

    loop {
        let joined = tokio::select! {
            _ = cancel.cancelled() => {
                branches.abort_all();
                while branches.join_next().await.is_some() {}
                return Err(StoreError::Cancelled);
            }
            joined = branches.join_next() => joined,
        };
        let Some(joined) = joined else { break };
        let subfolders = match joined {
            Ok(branch) => branch?,
            Err(join_err) if join_err.is_cancelled() => continue,
            Err(join_err) => return Err(StoreError::backend(join_err)),
        };

        let capped = match options.max_results {
            Some(cap) => results.lock().await.len() >= cap,
            None => false,
        };
        if capped {
            branches.abort_all();
            while branches.join_next().await.is_some() {}
            break;
        }

        for folder in subfolders {
            spawn_branch(
                &mut branches,
                Arc::clone(&backend),
                options.clone(),
                folder,
                Arc::clone(&semaphore),
                Arc::clone(&results),
                cancel.clone(),
            );
        }
    }

    let mut out = match Arc::try_unwrap(results) {
        Ok(mutex) => mutex.into_inner(),
        Err(shared) => shared.lock().await.clone(),
    };
    if let Some(cap) = options.max_results {
        out.truncate(cap);
    }
    Ok(out)
}

/// List one folder, accumulate survivors, report subfolders to walk next.
fn spawn_branch(
    branches: &mut JoinSet<Result<Vec<Path>, StoreError>>,
    backend: Arc<dyn StorageBackend>,
    options: ListOptions,
    folder: Path,
    semaphore: Arc<Semaphore>,
    results: Arc<Mutex<Vec<Blob>>>,
    cancel: CancellationToken,
) {
    branches.spawn(async move {
        let _permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| StoreError::Cancelled)?;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let mut level = options.clone();
        level.folder_path = folder;
        level.recurse = false;
        let chunk = backend.list(&level).await?;

        // recursion is driven by the raw folder children; the filter only
        // decides what gets accumulated
        let mut subfolders = Vec::new();
        let mut kept = Vec::new();
        for blob in chunk {
            if blob.is_folder() {
                subfolders.push(blob.full_path());
            }
            if options.is_match(&blob) && options.passes_filter(&blob) {
                kept.push(blob);
            }
        }

        let mut accumulator = results.lock().await;
        let capped = options.add(&mut accumulator, kept);
        Ok(if capped { Vec::new() } else { subfolders })
    });
}

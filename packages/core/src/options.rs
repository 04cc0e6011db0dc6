//! Query descriptor for listing operations.

use std::fmt;
use std::sync::Arc;

use crate::blob::Blob;
use crate::error::StoreError;
use crate::path::{Path, PathError};

/// Maximum accepted length of a file-name prefix, in bytes.
pub const MAX_PREFIX_LEN: usize = 1024;

/// Client-side filter predicate applied to candidate rows.
pub type BrowseFilter = Arc<dyn Fn(&Blob) -> bool + Send + Sync>;

/// Describes one listing query: where to look, what to keep, how much to
/// return.
///
/// Cloning produces a value copy that is safe to mutate for a nested
/// sub-call (typically rewriting `folder_path`) without affecting the
/// caller's options; the filter itself is a shared predicate.
///
/// # Examples
///
/// ```rust
/// use omnistore_core::{path, ListOptions};
///
/// let options = ListOptions::folder(path!("/docs"))
///     .with_prefix("report-")
///     .recursive()
///     .with_max_results(100);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ListOptions {
    /// Folder to list. Defaults to the root.
    pub folder_path: Path,
    /// Keep only files whose name starts with this prefix.
    pub file_prefix: Option<String>,
    /// Optional client-side predicate applied to every candidate row.
    pub browse_filter: Option<BrowseFilter>,
    /// Descend into subfolders.
    pub recurse: bool,
    /// Global cap on the number of returned rows.
    pub max_results: Option<usize>,
    /// Whether result rows carry their attribute maps.
    pub include_attributes: bool,
}

impl ListOptions {
    /// Options for listing `folder_path`, single level, no filtering.
    pub fn folder(folder_path: Path) -> Self {
        ListOptions {
            folder_path,
            file_prefix: None,
            browse_filter: None,
            recurse: false,
            max_results: None,
            include_attributes: false,
        }
    }

    /// Options for listing the namespace root.
    pub fn root() -> Self {
        Self::folder(Path::root())
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    pub fn with_filter(mut self, filter: BrowseFilter) -> Self {
        self.browse_filter = Some(filter);
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recurse = true;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn with_attributes(mut self) -> Self {
        self.include_attributes = true;
        self
    }

    /// Validate the descriptor before any I/O is issued.
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(prefix) = &self.file_prefix {
            if prefix.len() > MAX_PREFIX_LEN {
                return Err(PathError::Invalid {
                    message: format!(
                        "file prefix of {} bytes exceeds the {MAX_PREFIX_LEN} byte limit",
                        prefix.len()
                    ),
                }
                .into());
            }
        }
        if self.max_results == Some(0) {
            return Err(PathError::Invalid {
                message: "max_results must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Name-prefix match: folders always match, files match when no prefix
    /// is set or their name starts with it.
    pub fn is_match(&self, blob: &Blob) -> bool {
        if blob.is_folder() {
            return true;
        }
        match &self.file_prefix {
            None => true,
            Some(prefix) => blob.name().starts_with(prefix.as_str()),
        }
    }

    /// Apply the browse filter, if one is set.
    pub fn passes_filter(&self, blob: &Blob) -> bool {
        match &self.browse_filter {
            None => true,
            Some(filter) => filter(blob),
        }
    }

    /// Merge `src` into `dest` without exceeding `max_results`.
    ///
    /// Returns whether the cap was reached, so callers can stop further
    /// recursion or fan-out early instead of collecting unbounded results
    /// and truncating afterward.
    pub fn add(&self, dest: &mut Vec<Blob>, src: impl IntoIterator<Item = Blob>) -> bool {
        match self.max_results {
            None => {
                dest.extend(src);
                false
            }
            Some(cap) => {
                for blob in src {
                    if dest.len() >= cap {
                        return true;
                    }
                    dest.push(blob);
                }
                dest.len() >= cap
            }
        }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for ListOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListOptions")
            .field("folder_path", &self.folder_path)
            .field("file_prefix", &self.file_prefix)
            .field("browse_filter", &self.browse_filter.is_some())
            .field("recurse", &self.recurse)
            .field("max_results", &self.max_results)
            .field("include_attributes", &self.include_attributes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobKind;
    use crate::path;

    #[test]
    fn defaults_target_the_root() {
        let options = ListOptions::default();
        assert!(options.folder_path.is_root());
        assert!(!options.recurse);
        assert!(options.max_results.is_none());
    }

    #[test]
    fn over_length_prefix_rejected() {
        let options = ListOptions::root().with_prefix("x".repeat(MAX_PREFIX_LEN + 1));
        assert!(options.validate().is_err());

        let options = ListOptions::root().with_prefix("x".repeat(MAX_PREFIX_LEN));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_cap_rejected() {
        let options = ListOptions::root().with_max_results(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn is_match_rules() {
        let options = ListOptions::root().with_prefix("report-");

        let matching = Blob::file(&path!("report-2024.csv"));
        let other = Blob::file(&path!("notes.txt"));
        let folder = Blob::folder(&path!("archive"));

        assert!(options.is_match(&matching));
        assert!(!options.is_match(&other));
        // folders always match regardless of prefix
        assert!(options.is_match(&folder));

        let unfiltered = ListOptions::root();
        assert!(unfiltered.is_match(&other));
    }

    #[test]
    fn add_respects_cap() {
        let options = ListOptions::root().with_max_results(3);
        let mut dest = Vec::new();

        let batch = |names: &[&str]| -> Vec<Blob> {
            names.iter().map(|n| Blob::file(&path!(n))).collect()
        };

        assert!(!options.add(&mut dest, batch(&["a", "b"])));
        assert_eq!(dest.len(), 2);

        assert!(options.add(&mut dest, batch(&["c", "d", "e"])));
        assert_eq!(dest.len(), 3);

        // once full, further merges are rejected immediately
        assert!(options.add(&mut dest, batch(&["f"])));
        assert_eq!(dest.len(), 3);
    }

    #[test]
    fn add_without_cap_takes_everything() {
        let options = ListOptions::root();
        let mut dest = Vec::new();
        let src: Vec<Blob> = (0..50)
            .map(|i| Blob::new(Path::root(), format!("f{i}"), BlobKind::File))
            .collect();
        assert!(!options.add(&mut dest, src));
        assert_eq!(dest.len(), 50);
    }

    #[test]
    fn clone_is_independent() {
        let options = ListOptions::folder(path!("a")).with_max_results(10);
        let mut sub = options.clone();
        sub.folder_path = path!("a/b");
        sub.recurse = true;

        assert_eq!(options.folder_path, path!("a"));
        assert!(!options.recurse);
        assert_eq!(sub.max_results, Some(10));
    }

    #[test]
    fn browse_filter_applies() {
        let options = ListOptions::root()
            .with_filter(Arc::new(|b: &Blob| b.name().ends_with(".txt")));

        assert!(options.passes_filter(&Blob::file(&path!("a.txt"))));
        assert!(!options.passes_filter(&Blob::file(&path!("a.bin"))));
    }

    #[test]
    fn debug_does_not_require_filter_debug() {
        let options = ListOptions::root().with_filter(Arc::new(|_: &Blob| true));
        let rendered = format!("{options:?}");
        assert!(rendered.contains("browse_filter: true"));
    }
}

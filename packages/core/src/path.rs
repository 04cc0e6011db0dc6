//! Virtual path type with normalized `/`-separated segments.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Maximum accepted length of a path string, in bytes.
///
/// Over-length input is rejected before any I/O happens.
pub const MAX_PATH_LEN: usize = 4096;

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string exceeds [`MAX_PATH_LEN`] bytes.
    #[error("path of {len} bytes exceeds the {MAX_PATH_LEN} byte limit")]
    TooLong { len: usize },
    /// The path or a related input is malformed.
    #[error("invalid path: {message}")]
    Invalid { message: String },
}

/// A normalized virtual path.
///
/// A path is an ordered sequence of non-empty segment strings; the root is
/// the distinguished zero-segment path. Parsing collapses repeated
/// separators and strips leading/trailing ones, so `"/a//b/"` and `"a/b"`
/// are the same path. Case is preserved - case sensitivity is a backend
/// policy, not enforced here.
///
/// # Examples
///
/// ```rust
/// use omnistore_core::Path;
///
/// let p = Path::parse("/docs/readme.txt").unwrap();
/// assert_eq!(p.len(), 2);
/// assert_eq!(p.to_string(), "/docs/readme.txt");
///
/// assert_eq!(Path::parse("docs//sub/").unwrap(), Path::parse("/docs/sub").unwrap());
/// assert!(Path::parse("").unwrap().is_root());
/// ```
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path (zero segments).
    pub fn root() -> Self {
        Path {
            segments: Vec::new(),
        }
    }

    /// Parse a path string.
    ///
    /// Both the empty string and a bare separator denote the root. Repeated
    /// and trailing separators are collapsed away. Fails fast on over-length
    /// input.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.len() > MAX_PATH_LEN {
            return Err(PathError::TooLong { len: s.len() });
        }
        let segments: Vec<String> = s
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(|seg| seg.to_string())
            .collect();
        Ok(Path { segments })
    }

    /// Build a path from pre-split segments, rejecting empty ones.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for seg in segments {
            let seg = seg.into();
            if seg.is_empty() {
                return Err(PathError::Invalid {
                    message: "empty path segment".to_string(),
                });
            }
            if seg.contains('/') {
                return Err(PathError::Invalid {
                    message: format!("segment '{}' contains a separator", seg),
                });
            }
            out.push(seg);
        }
        Ok(Path { segments: out })
    }

    /// True for the zero-segment root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the path has no segments (same as [`Path::is_root`]).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment list in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, or `""` at the root.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// The containing path. The root's parent is the root.
    #[must_use]
    pub fn parent(&self) -> Path {
        if self.segments.is_empty() {
            return Path::root();
        }
        Path {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Concatenate another path onto this one.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// Append the segments parsed out of `name`.
    ///
    /// An empty `name` is a no-op, so the root blob's `(folder, "")` pair
    /// combines back to the folder itself.
    #[must_use]
    pub fn child(&self, name: &str) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(name.split('/').filter(|s| !s.is_empty()).map(String::from));
        Path { segments }
    }

    /// The first `depth` segments as a new path.
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Path {
        let depth = depth.min(self.segments.len());
        Path {
            segments: self.segments[..depth].to_vec(),
        }
    }

    /// True when `prefix` is a segment-wise prefix of this path.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix.segments == self.segments[..prefix.segments.len()]
    }

    /// This path with `prefix` stripped, or `None` if it does not match.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if self.has_prefix(prefix) {
            Some(Path {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Path::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use omnistore_core::path;
///
/// let p = path!("/docs/readme.txt");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn parse_basic_paths() {
        assert_eq!(Path::parse("").unwrap().len(), 0);
        assert_eq!(Path::parse("/").unwrap().len(), 0);
        assert_eq!(Path::parse("docs").unwrap().len(), 1);
        assert_eq!(Path::parse("/docs/readme.txt").unwrap().len(), 2);
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(path!("a//b"), path!("a/b"));
        assert_eq!(path!("/a/b/"), path!("a/b"));
        assert_eq!(path!("///"), Path::root());
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["", "/", "a", "//a//b///c/", "/docs/readme.txt"] {
            let once = Path::parse(raw).unwrap();
            let twice = Path::parse(&once.to_string()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn over_length_rejected() {
        let long = "a/".repeat(MAX_PATH_LEN);
        let err = Path::parse(&long).unwrap_err();
        assert!(matches!(err, PathError::TooLong { .. }));
    }

    #[test]
    fn from_segments_rejects_bad_input() {
        assert!(Path::from_segments(["a", ""]).is_err());
        assert!(Path::from_segments(["a/b"]).is_err());
        assert_eq!(Path::from_segments(["a", "b"]).unwrap(), path!("a/b"));
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(Path::root().parent(), Path::root());
        assert_eq!(path!("a/b").parent(), path!("a"));
        assert_eq!(path!("a").parent(), Path::root());
    }

    #[test]
    fn name_and_prefix() {
        let p = path!("a/b/c");
        assert_eq!(p.name(), "c");
        assert_eq!(Path::root().name(), "");
        assert_eq!(p.prefix(2), path!("a/b"));
        assert_eq!(p.prefix(0), Path::root());
        assert_eq!(p.prefix(9), p);
    }

    #[test]
    fn child_appends_segments() {
        assert_eq!(path!("a").child("b"), path!("a/b"));
        assert_eq!(path!("a").child(""), path!("a"));
        assert_eq!(Path::root().child("x/y"), path!("x/y"));
    }

    #[test]
    fn prefix_tests() {
        let p = path!("a/b/c");
        assert!(p.has_prefix(&Path::root()));
        assert!(p.has_prefix(&path!("a/b")));
        assert!(!p.has_prefix(&path!("b")));
        assert_eq!(p.strip_prefix(&path!("a")), Some(path!("b/c")));
        assert_eq!(p.strip_prefix(&path!("x")), None);
    }

    #[test]
    fn display_renders_canonical_form() {
        assert_eq!(Path::root().to_string(), "/");
        assert_eq!(path!("docs/readme.txt").to_string(), "/docs/readme.txt");
    }

    #[test]
    fn serde_round_trip() {
        let p = path!("a/b/c");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"/a/b/c\"");
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn ordering_is_segment_wise() {
        assert!(path!("a/b") < path!("a/c"));
        assert!(path!("a/c") < path!("b"));
    }
}

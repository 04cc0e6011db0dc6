//! Error types shared across the omnistore layers.

use thiserror::Error;

use crate::path::{Path, PathError};

/// Errors surfaced by the routing layer and by backends.
///
/// Input validation fails before any I/O. A missing blob on read or get is
/// represented as `None` in the result, not as an error; [`StoreError::NotFound`]
/// exists for the operations that are inherently single-target and must
/// report failure. Backend-specific failures are surfaced unchanged through
/// [`StoreError::Backend`] rather than swallowed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Path or prefix validation error.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// No registered mount covers the path.
    #[error("no mount covers path {0}")]
    NoRoute(Path),

    /// A single-target operation addressed a blob that does not exist.
    #[error("blob not found at {0}")]
    NotFound(Path),

    /// Attribute byte-stream version mismatch or corruption.
    #[error("attribute format error: {0}")]
    Format(String),

    /// The call was cancelled cooperatively.
    #[error("operation cancelled")]
    Cancelled,

    /// Opaque backend failure, passed through unchanged.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an arbitrary backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

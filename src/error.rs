//! Error types for tree construction, queries and persistence.

use thiserror::Error;

/// Errors reported by [`SsTree`](crate::SsTree) operations.
#[derive(Debug, Error)]
pub enum SsTreeError {
    /// Fan-out bounds or dimension that cannot form a valid tree.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Point dimension differs from the tree dimension.
    #[error("dimension mismatch: tree has {expected} dimensions, point has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate at axis {axis}")]
    NonFiniteCoordinate { axis: usize },

    /// A nearest neighbor query asked for zero neighbors.
    #[error("k must be greater than 0")]
    InvalidK,

    /// The tree has no root to persist.
    #[error("tree is empty")]
    EmptyTree,

    /// I/O error while reading or writing a tree file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream is not a well-formed tree encoding.
    #[error("format error: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, SsTreeError>;

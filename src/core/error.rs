//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Most filesystem and pattern failures are recovered inside the tree and filter
/// operations and only logged. This type is returned where a caller can act on the
/// failure, e.g. opening a root folder that does not exist.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// Represents a path that was expected to be a directory but was not.
    #[error("Path is not a valid directory: {0}")]
    NotADirectory(PathBuf),

    /// A filter expression that is not a valid regular expression.
    #[error("Invalid regular expression: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A path that has no node in the open tree.
    #[error("No node for {0}")]
    UnknownNode(PathBuf),

    /// Represents a user-initiated cancellation of an operation.
    #[error("Operation was cancelled by the user")]
    Cancelled,
}

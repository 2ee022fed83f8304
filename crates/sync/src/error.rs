//! Sync Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Absence is never an error here: a missing local file
//! or remote object is a fact that drives classification. Only reads that
//! fail and store requests that fail end up in this enum.

use crate::status::Status;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Resolve was asked for a local file that isn't there.
    #[display("local file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The local tree could not be inspected or read.
    #[display("could not read local file: {}", _0.display())]
    Local(#[error(not(source))] PathBuf),
    /// A local file was unreadable (or undecodable) while hashing.
    #[display("could not hash local file: {}", _0.display())]
    Hash(#[error(not(source))] PathBuf),
    /// Fetching the full remote descriptor failed during classification.
    #[display("could not fetch remote metadata for {}", _0.display())]
    Fetch(#[error(not(source))] PathBuf),
    /// A store mutation failed; fatal to this resource only.
    #[display("remote request failed for {} ({status})", path.display())]
    Transport { path: PathBuf, status: Status },
    /// The logical path has no valid object key.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The configured store could not be set up.
    #[display("could not connect to remote store: {_0}")]
    Connect(#[error(not(source))] String),
    /// Listing the bucket or walking the build tree failed.
    #[display("could not enumerate {_0}")]
    Enumerate(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Transport { .. } | Self::Enumerate(_))
    }

    /// The logical path this error is about, if it is about one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound(path)
            | Self::Local(path)
            | Self::Hash(path)
            | Self::Fetch(path)
            | Self::InvalidPath(path)
            | Self::Transport { path, .. } => Some(path),
            Self::Connect(_) | Self::Enumerate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_names_path_and_status() {
        let kind = ErrorKind::Transport { path: PathBuf::from("a.txt"), status: Status::New };
        assert_eq!(kind.to_string(), "remote request failed for a.txt (new)");
        assert!(kind.is_retryable());
        assert_eq!(kind.path(), Some(&PathBuf::from("a.txt")));
    }

    #[test]
    fn test_hash_is_not_retryable() {
        assert!(!ErrorKind::Hash(PathBuf::from("a.txt")).is_retryable());
    }
}

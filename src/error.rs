//! Error types for configuration, metadata decoding, transfers and traversal.
//!
//! Messages are constant; the paths and operation involved travel as fields
//! so callers can render them however they like.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Startup errors: nothing has been traversed yet when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid filename pattern `{pattern}`")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("expected at least two paths (sources then destination), got {got}")]
    NotEnoughPaths { got: usize },
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata container")]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("failed to decode exif data")]
    Exif { source: exif::Error },
    #[error("unparseable capture date `{value}`")]
    InvalidDate { value: String },
}

/// Failures of a single copy or move.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("not a file: {}", path.display())]
    NotAFile { path: PathBuf },
    #[error("source and destination are the same file: {}", path.display())]
    SameFile { path: PathBuf },
    #[error("transfer io failure during {operation}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to rename {} to {}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("incomplete copy to {}: wrote {written} of {expected} bytes", path.display())]
    Truncated {
        path: PathBuf,
        written: u64,
        expected: u64,
    },
}

impl TransferError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Failures that affect one candidate file; traversal carries on past them
/// unless the error policy says otherwise.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to stat {}", path.display())]
    Stat { path: PathBuf, source: io::Error },
    #[error("failed to read directory entry under {}", path.display())]
    Entry {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to create destination directory {}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to transfer {}", path.display())]
    Transfer {
        path: PathBuf,
        source: TransferError,
    },
}

impl FileError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Stat { path, .. }
            | Self::Entry { path, .. }
            | Self::CreateDir { path, .. }
            | Self::Transfer { path, .. } => path,
        }
    }
}

/// Errors that end the traversal of one source directory.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("source {} is not accessible", path.display())]
    Source { path: PathBuf, source: io::Error },
    #[error("source {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error("failed to list source {}", path.display())]
    List {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("traversal aborted after a file failure")]
    Aborted {
        #[source]
        source: FileError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn transfer_io_helper_keeps_context() {
        let err = TransferError::io("open source", "a.jpg", io::Error::other("boom"));
        match &err {
            TransferError::Io {
                operation, path, ..
            } => {
                assert_eq!(*operation, "open source");
                assert_eq!(path, &PathBuf::from("a.jpg"));
            }
            other => panic!("unexpected variant {other:?}"),
        }
        assert!(err.source().is_some());
    }

    #[test]
    fn aborted_walk_chains_file_error() {
        let file = FileError::CreateDir {
            path: PathBuf::from("dest/2023-07"),
            source: io::Error::other("denied"),
        };
        assert_eq!(file.path(), std::path::Path::new("dest/2023-07"));
        let walk = WalkError::Aborted { source: file };
        let chained = walk.source().map(|cause| cause.to_string());
        assert_eq!(
            chained.as_deref(),
            Some("failed to create destination directory dest/2023-07")
        );
    }

    #[test]
    fn truncated_message_reports_counts() {
        let err = TransferError::Truncated {
            path: PathBuf::from("out.jpg"),
            written: 3,
            expected: 10,
        };
        assert_eq!(
            err.to_string(),
            "incomplete copy to out.jpg: wrote 3 of 10 bytes"
        );
    }
}

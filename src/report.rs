//! Diagnostics emitted while organizing files.
//!
//! The walker and transfer code only ever talk to a [`Reporter`]; which
//! subscriber (if any) sees the events is up to the caller.

use std::io;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, trace, warn};

use crate::config::TransferMode;
use crate::error::{FileError, MetadataError};

/// Where an effective timestamp came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateSource {
    Metadata,
    Modified,
}

impl DateSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Modified => "modified",
        }
    }
}

#[derive(Debug)]
pub enum Event<'a> {
    EnterDirectory {
        path: &'a Path,
    },
    SkipDirectory {
        path: &'a Path,
    },
    NoMatch {
        path: &'a Path,
    },
    MetadataUnreadable {
        path: &'a Path,
        error: &'a MetadataError,
    },
    DateResolved {
        path: &'a Path,
        source: DateSource,
        timestamp: NaiveDateTime,
    },
    Planned {
        source: &'a Path,
        destination: &'a Path,
        mode: TransferMode,
    },
    Transferred {
        source: &'a Path,
        destination: &'a Path,
        mode: TransferMode,
        bytes: u64,
    },
    TimestampNotPreserved {
        path: &'a Path,
        error: &'a io::Error,
    },
    PermissionsNotPreserved {
        path: &'a Path,
        error: &'a io::Error,
    },
    Failed {
        error: &'a FileError,
    },
}

impl Event<'_> {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EnterDirectory { .. } => "enter_directory",
            Self::SkipDirectory { .. } => "skip_directory",
            Self::NoMatch { .. } => "no_match",
            Self::MetadataUnreadable { .. } => "metadata_unreadable",
            Self::DateResolved { .. } => "date_resolved",
            Self::Planned { .. } => "planned",
            Self::Transferred { .. } => "transferred",
            Self::TimestampNotPreserved { .. } => "timestamp_not_preserved",
            Self::PermissionsNotPreserved { .. } => "permissions_not_preserved",
            Self::Failed { .. } => "failed",
        }
    }

    /// The path the event is about; the source side for transfers.
    pub fn path(&self) -> &Path {
        match self {
            Self::EnterDirectory { path }
            | Self::SkipDirectory { path }
            | Self::NoMatch { path }
            | Self::MetadataUnreadable { path, .. }
            | Self::DateResolved { path, .. }
            | Self::TimestampNotPreserved { path, .. }
            | Self::PermissionsNotPreserved { path, .. } => *path,
            Self::Planned { source, .. } | Self::Transferred { source, .. } => *source,
            Self::Failed { error } => error.path(),
        }
    }
}

/// Renders an error and all of its sources as `outer: inner: ...`.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}

pub trait Reporter {
    fn report(&mut self, event: Event<'_>);
}

/// Forwards every event to `tracing` with structured fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: Event<'_>) {
        match event {
            Event::EnterDirectory { path } => {
                trace!(path = %path.display(), "entering directory");
            }
            Event::SkipDirectory { path } => {
                trace!(path = %path.display(), "skipping directory: recursion disabled");
            }
            Event::NoMatch { path } => {
                trace!(path = %path.display(), "skipping: filename did not match filter");
            }
            Event::MetadataUnreadable { path, error } => {
                debug!(path = %path.display(), error = %error, "no usable exif date, using modification time");
            }
            Event::DateResolved {
                path,
                source,
                timestamp,
            } => {
                debug!(path = %path.display(), source = source.as_str(), %timestamp, "resolved photo date");
            }
            Event::Planned {
                source,
                destination,
                mode,
            } => {
                info!(src = %source.display(), dest = %destination.display(), ?mode, "dry run: would transfer");
            }
            Event::Transferred {
                source,
                destination,
                mode,
                bytes,
            } => {
                info!(src = %source.display(), dest = %destination.display(), ?mode, bytes, "transferred file");
            }
            Event::TimestampNotPreserved { path, error } => {
                warn!(path = %path.display(), error = %error, "failed to preserve modification time");
            }
            Event::PermissionsNotPreserved { path, error } => {
                warn!(path = %path.display(), error = %error, "failed to preserve permissions");
            }
            Event::Failed { error } => {
                error!(path = %error.path().display(), error = %error_chain(error), "file failed");
            }
        }
    }
}

/// Keeps `(kind, path)` pairs so tests can assert on what was reported.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) events: Vec<(&'static str, std::path::PathBuf)>,
}

#[cfg(test)]
impl Recorder {
    pub(crate) fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(|(kind, _)| *kind).collect()
    }

    pub(crate) fn paths_of(&self, kind: &str) -> Vec<std::path::PathBuf> {
        self.events
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, path)| path.clone())
            .collect()
    }
}

#[cfg(test)]
impl Reporter for Recorder {
    fn report(&mut self, event: Event<'_>) {
        self.events.push((event.kind(), event.path().to_path_buf()));
    }
}

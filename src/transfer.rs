use std::{
    fs::{self, File, Metadata},
    io,
    path::Path,
};

use filetime::FileTime;
use tempfile::NamedTempFile;

use crate::config::TransferMode;
use crate::error::TransferError;
use crate::report::{Event, Reporter};

/// A completed copy or move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transferred {
    pub bytes: u64,
}

/// Copies or moves one regular file to `destination`, overwriting whatever is
/// there.
///
/// Moves are a single rename and never fall back to copy-then-delete. Copies
/// are checked against the source size and flushed to disk before they
/// replace the destination, then get the source's permissions and
/// modification time; failing to apply either of those is reported but does
/// not fail the transfer.
pub fn transfer(
    source: &Path,
    destination: &Path,
    mode: TransferMode,
    reporter: &mut dyn Reporter,
) -> Result<Transferred, TransferError> {
    let metadata =
        fs::metadata(source).map_err(|e| TransferError::io("stat source", source, e))?;
    if metadata.is_dir() {
        return Err(TransferError::NotAFile {
            path: source.to_path_buf(),
        });
    }

    if let (Ok(from), Ok(to)) = (fs::canonicalize(source), fs::canonicalize(destination)) {
        if from == to {
            return Err(TransferError::SameFile { path: from });
        }
    }

    match mode {
        TransferMode::Move => {
            fs::rename(source, destination).map_err(|e| TransferError::Rename {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            })?;
            Ok(Transferred {
                bytes: metadata.len(),
            })
        }
        TransferMode::Copy => {
            let written = copy_contents(source, destination, &metadata, reporter)?;
            preserve_mtime(
                destination,
                FileTime::from_last_modification_time(&metadata),
                reporter,
            );
            Ok(Transferred { bytes: written })
        }
    }
}

/// Streams the bytes into a temporary file beside `destination`, then renames
/// it over the target. An existing destination is replaced, never opened for
/// writing, so read-only copies from earlier runs and hard links back to the
/// source are left intact.
fn copy_contents(
    source: &Path,
    destination: &Path,
    metadata: &Metadata,
    reporter: &mut dyn Reporter,
) -> Result<u64, TransferError> {
    let dir = destination
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged =
        NamedTempFile::new_in(dir).map_err(|e| TransferError::io("stage destination", dir, e))?;

    let mut reader =
        File::open(source).map_err(|e| TransferError::io("open source", source, e))?;
    let written = io::copy(&mut reader, staged.as_file_mut())
        .map_err(|e| TransferError::io("copy", staged.path(), e))?;
    drop(reader);
    verify_length(destination, written, metadata.len())?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| TransferError::io("sync destination", staged.path(), e))?;

    if let Err(error) = staged.as_file().set_permissions(metadata.permissions()) {
        reporter.report(Event::PermissionsNotPreserved {
            path: destination,
            error: &error,
        });
    }

    staged
        .persist(destination)
        .map_err(|e| TransferError::io("replace destination", destination, e.error))?;
    Ok(written)
}

fn verify_length(destination: &Path, written: u64, expected: u64) -> Result<(), TransferError> {
    if written == expected {
        Ok(())
    } else {
        Err(TransferError::Truncated {
            path: destination.to_path_buf(),
            written,
            expected,
        })
    }
}

fn preserve_mtime(destination: &Path, mtime: FileTime, reporter: &mut dyn Reporter) {
    if let Err(error) = filetime::set_file_mtime(destination, mtime) {
        reporter.report(Event::TimestampNotPreserved {
            path: destination,
            error: &error,
        });
    }
}

use std::{
    ffi::OsStr,
    fs::{self, DirBuilder, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::config::{Config, ErrorPolicy};
use crate::error::{FileError, MetadataError, WalkError};
use crate::extractor::{modified_time, CaptureDateSource, ExifDecoder};
use crate::report::{DateSource, Event, Reporter};
use crate::resolver::resolve;
use crate::transfer::transfer;

/// Decides which filenames are organized.
pub trait NameFilter {
    fn matches(&self, file_name: &str) -> bool;
}

impl NameFilter for Regex {
    fn matches(&self, file_name: &str) -> bool {
        self.is_match(file_name)
    }
}

/// Per-run counters, accumulated across every source walked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub transferred: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One file under consideration.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub path: &'a Path,
    pub name: &'a OsStr,
    pub modified: NaiveDateTime,
}

#[cfg(unix)]
const DESTINATION_DIR_MODE: u32 = 0o755;

pub struct Walker<'a> {
    config: &'a Config,
    filter: &'a dyn NameFilter,
    dates: &'a dyn CaptureDateSource,
    reporter: &'a mut dyn Reporter,
    summary: RunSummary,
}

impl<'a> Walker<'a> {
    /// Walker using the configured pattern and the EXIF decoder.
    pub fn new(config: &'a Config, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            config,
            filter: &config.pattern,
            dates: &ExifDecoder,
            reporter,
            summary: RunSummary::default(),
        }
    }

    pub fn with_filter(mut self, filter: &'a dyn NameFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_dates(mut self, dates: &'a dyn CaptureDateSource) -> Self {
        self.dates = dates;
        self
    }

    /// Counters accumulated over every `walk` call so far.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Organizes every matching file under `source`.
    ///
    /// Entries are visited depth-first in filename order. A missing or
    /// unlistable `source` is an error; failures on individual files are
    /// reported and counted, and only end the walk under
    /// [`ErrorPolicy::Abort`].
    pub fn walk(&mut self, source: &Path) -> Result<(), WalkError> {
        let metadata = fs::metadata(source).map_err(|e| WalkError::Source {
            path: source.to_path_buf(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(WalkError::NotADirectory {
                path: source.to_path_buf(),
            });
        }
        self.reporter.report(Event::EnterDirectory { path: source });

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let mut guard = DestinationGuard::new(&self.config.destination);
        let entries = WalkDir::new(source)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !guard.is_destination(entry));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(WalkError::List {
                        path: source.to_path_buf(),
                        source: err,
                    });
                }
                Err(err) => {
                    let path = err.path().unwrap_or(source).to_path_buf();
                    self.fail(FileError::Entry { path, source: err })?;
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                let path = entry.path();
                if self.config.recursive {
                    self.reporter.report(Event::EnterDirectory { path });
                } else {
                    self.reporter.report(Event::SkipDirectory { path });
                }
                continue;
            }

            if let Err(error) = self.process_file(&entry) {
                self.fail(error)?;
            }
        }
        Ok(())
    }

    fn fail(&mut self, error: FileError) -> Result<(), WalkError> {
        self.summary.failed += 1;
        self.reporter.report(Event::Failed { error: &error });
        match self.config.on_error {
            ErrorPolicy::Continue => Ok(()),
            ErrorPolicy::Abort => Err(WalkError::Aborted { source: error }),
        }
    }

    fn process_file(&mut self, entry: &DirEntry) -> Result<(), FileError> {
        let path = entry.path();
        let name = entry.file_name();
        if !self.filter.matches(&name.to_string_lossy()) {
            self.summary.skipped += 1;
            self.reporter.report(Event::NoMatch { path });
            return Ok(());
        }

        let modified = fs::metadata(path)
            .and_then(|metadata| modified_time(&metadata))
            .map_err(|e| FileError::Stat {
                path: path.to_path_buf(),
                source: e,
            })?;
        let candidate = Candidate {
            path,
            name,
            modified,
        };

        let (timestamp, source) = self.effective_timestamp(&candidate);
        self.reporter.report(Event::DateResolved {
            path,
            source,
            timestamp,
        });

        let destination = resolve(&self.config.destination, &timestamp, candidate.name);
        if self.config.dry_run {
            self.summary.planned += 1;
            self.reporter.report(Event::Planned {
                source: path,
                destination: &destination.file,
                mode: self.config.mode,
            });
            return Ok(());
        }

        create_destination_dir(&destination.dir).map_err(|e| FileError::CreateDir {
            path: destination.dir.clone(),
            source: e,
        })?;

        let done = transfer(path, &destination.file, self.config.mode, &mut *self.reporter)
            .map_err(|e| FileError::Transfer {
                path: path.to_path_buf(),
                source: e,
            })?;
        self.summary.transferred += 1;
        self.reporter.report(Event::Transferred {
            source: path,
            destination: &destination.file,
            mode: self.config.mode,
            bytes: done.bytes,
        });
        Ok(())
    }

    fn effective_timestamp(&mut self, candidate: &Candidate<'_>) -> (NaiveDateTime, DateSource) {
        if self.config.ignore_metadata {
            return (candidate.modified, DateSource::Modified);
        }
        match self.read_capture_date(candidate.path) {
            Ok(Some(timestamp)) => (timestamp, DateSource::Metadata),
            Ok(None) => (candidate.modified, DateSource::Modified),
            Err(error) => {
                self.reporter.report(Event::MetadataUnreadable {
                    path: candidate.path,
                    error: &error,
                });
                (candidate.modified, DateSource::Modified)
            }
        }
    }

    fn read_capture_date(&self, path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
        let mut reader = BufReader::new(File::open(path)?);
        self.dates.capture_date(path, &mut reader)
    }
}

/// Keeps a walk from descending into the destination when it sits inside a
/// source. The destination may only come into existence partway through a
/// walk, so it is resolved again until it can be canonicalized.
struct DestinationGuard {
    root: PathBuf,
    resolved: Option<PathBuf>,
}

impl DestinationGuard {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            resolved: None,
        }
    }

    fn is_destination(&mut self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        if self.resolved.is_none() {
            self.resolved = fs::canonicalize(&self.root).ok();
        }
        let Some(destination) = self.resolved.as_deref() else {
            return false;
        };
        fs::canonicalize(entry.path()).is_ok_and(|path| path == destination)
    }
}

fn create_destination_dir(path: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DESTINATION_DIR_MODE);
    }
    builder.create(path)
}

/// Walks every configured source in order. Sources that cannot be walked are
/// returned alongside their error; the rest of the run carries on unless the
/// error was an abort.
pub fn organize(
    config: &Config,
    reporter: &mut dyn Reporter,
) -> (RunSummary, Vec<(PathBuf, WalkError)>) {
    let mut walker = Walker::new(config, reporter);
    let mut failures = Vec::new();
    for source in &config.sources {
        if let Err(error) = walker.walk(source) {
            let aborted = matches!(error, WalkError::Aborted { .. });
            failures.push((source.clone(), error));
            if aborted {
                break;
            }
        }
    }
    (walker.summary(), failures)
}

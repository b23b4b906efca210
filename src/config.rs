use std::path::PathBuf;

use regex::Regex;

use crate::error::ConfigError;

/// Filenames picked up when no `--filter` is given.
pub const DEFAULT_PATTERN: &str = r"(?i)\.(jpg|dng|tiff|jpeg|mpg|mp4|mov)$";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

/// What the walker does after a per-file failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Abort,
}

/// Options for a single run. Built once at startup and only read afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub mode: TransferMode,
    pub ignore_metadata: bool,
    pub recursive: bool,
    pub verbose: bool,
    pub dry_run: bool,
    pub on_error: ErrorPolicy,
    pub pattern: Regex,
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
}

impl Config {
    /// Compiles `pattern` and splits `paths` into sources and the trailing
    /// destination. All flags start out at their defaults.
    pub fn new(pattern: &str, mut paths: Vec<PathBuf>) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;

        if paths.len() < 2 {
            return Err(ConfigError::NotEnoughPaths { got: paths.len() });
        }
        let Some(destination) = paths.pop() else {
            return Err(ConfigError::NotEnoughPaths { got: 0 });
        };

        Ok(Self {
            mode: TransferMode::default(),
            ignore_metadata: false,
            recursive: false,
            verbose: false,
            dry_run: false,
            on_error: ErrorPolicy::default(),
            pattern,
            sources: paths,
            destination,
        })
    }
}

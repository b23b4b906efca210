use std::{path::PathBuf, process::ExitCode};

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use tracing::{error, info, trace};
use tracing_subscriber::EnvFilter;

use photomunch::{
    config::{Config, ErrorPolicy, TransferMode, DEFAULT_PATTERN},
    organize,
    report::error_chain,
    TracingReporter,
};

/// Exit status for usage and configuration problems.
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_format = cli.log_format;
    let config = cli.into_config();

    let verbose = config.as_ref().is_ok_and(|config| config.verbose);
    if let Err(err) = init_logging(verbose, log_format) {
        eprintln!("{err:#}");
        return ExitCode::from(EXIT_CONFIG);
    }
    trace!("tracing enabled");

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!(error = %error_chain(&err), "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    trace!(sources = ?config.sources, destination = %config.destination.display(), "start processing");

    let (summary, failures) = organize(&config, &mut TracingReporter);
    for (source, err) in &failures {
        error!(source = %source.display(), error = %error_chain(err), "source failed");
    }
    info!(
        transferred = summary.transferred,
        planned = summary.planned,
        skipped = summary.skipped,
        failed = summary.failed,
        "done"
    );

    if failures.is_empty() && summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging(verbose: bool, format: LogFormat) -> anyhow::Result<()> {
    let level = if verbose { "trace" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

#[derive(Parser)]
#[command(name = "photomunch")]
#[command(version, about = "Ingests photos into year-month folders based on their EXIF data")]
#[command(long_about = "Reads the EXIF date (or, barring that, the file modification date) of \
every file in the source directories that matches the filter, and copies or moves it into \
a YYYY-MM subdirectory of the destination.")]
struct Cli {
    /// Move instead of copy
    #[arg(short, long = "move")]
    move_files: bool,

    /// Ignore EXIF data and date files by modification time only
    #[arg(short = 'e', long)]
    ignore_exif: bool,

    /// Recurse into subdirectories of each source
    #[arg(short, long)]
    recursive: bool,

    /// Log everything down to trace level
    #[arg(short, long)]
    verbose: bool,

    /// Regex describing filenames to organize
    #[arg(short, long, default_value = DEFAULT_PATTERN)]
    filter: String,

    /// Report where files would go without touching anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Stop the whole run at the first file that fails
    #[arg(long)]
    fail_fast: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Source directories followed by the destination directory
    #[arg(value_hint = clap::ValueHint::DirPath, value_name = "PATHS")]
    paths: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl Cli {
    fn into_config(self) -> Result<Config, photomunch::ConfigError> {
        Ok(Config {
            mode: if self.move_files {
                TransferMode::Move
            } else {
                TransferMode::Copy
            },
            ignore_metadata: self.ignore_exif,
            recursive: self.recursive,
            verbose: self.verbose,
            dry_run: self.dry_run,
            on_error: if self.fail_fast {
                ErrorPolicy::Abort
            } else {
                ErrorPolicy::Continue
            },
            ..Config::new(&self.filter, self.paths)?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "photomunch", "--move", "-e", "-r", "--fail-fast", "-f", r"\.png$", "a", "b", "out",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.mode, TransferMode::Move);
        assert!(config.ignore_metadata);
        assert!(config.recursive);
        assert!(!config.dry_run);
        assert!(!config.verbose);
        assert_eq!(config.on_error, ErrorPolicy::Abort);
        assert!(config.pattern.is_match("x.png"));
        assert_eq!(config.sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(config.destination, PathBuf::from("out"));
    }

    #[test]
    fn verbose_flag_reaches_config() {
        let cli = Cli::parse_from(["photomunch", "-v", "in", "out"]);
        assert!(cli.into_config().unwrap().verbose);
    }

    #[test]
    fn one_path_is_a_config_error() {
        let cli = Cli::parse_from(["photomunch", "only"]);
        assert!(matches!(
            cli.into_config(),
            Err(photomunch::ConfigError::NotEnoughPaths { got: 1 })
        ));
    }
}

//! Sorts photos from one or more source directories into `YYYY-MM`
//! subdirectories of a destination, dated by EXIF capture time or, failing
//! that, by modification time.

pub mod config;
pub mod error;
pub mod extractor;
pub mod report;
pub mod resolver;
pub mod transfer;
pub mod walker;

pub use config::{Config, ErrorPolicy, TransferMode, DEFAULT_PATTERN};
pub use error::{ConfigError, FileError, MetadataError, TransferError, WalkError};
pub use extractor::{CaptureDateSource, ExifDecoder, MediaReader};
pub use report::{Event, Reporter, TracingReporter};
pub use resolver::{resolve, Destination};
pub use transfer::{transfer, Transferred};
pub use walker::{organize, NameFilter, RunSummary, Walker};

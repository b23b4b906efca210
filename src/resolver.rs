use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::Datelike;

/// Where a single file lands under the destination root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub dir: PathBuf,
    pub file: PathBuf,
}

/// Year-month label such as `2023-07`, taken from the timestamp as given.
pub fn month_label<T: Datelike>(timestamp: &T) -> String {
    format!("{:04}-{:02}", timestamp.year(), timestamp.month())
}

/// Joins `root` with the month label of `timestamp`, then with `file_name`.
/// Pure path construction; the filesystem is not consulted.
pub fn resolve<T: Datelike>(root: &Path, timestamp: &T, file_name: &OsStr) -> Destination {
    let dir = root.join(month_label(timestamp));
    let file = dir.join(file_name);
    Destination { dir, file }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn label_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        assert_eq!(month_label(&date), "2023-07");
        let date = NaiveDate::from_ymd_opt(999, 12, 1).unwrap();
        assert_eq!(month_label(&date), "0999-12");
    }

    #[test]
    fn destination_keeps_original_name() {
        let ts = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let dest = resolve(Path::new("/photos"), &ts, OsStr::new("IMG_0001.JPG"));
        assert_eq!(dest.dir, PathBuf::from("/photos/2022-01"));
        assert_eq!(dest.file, PathBuf::from("/photos/2022-01/IMG_0001.JPG"));
    }

    #[test]
    fn same_name_same_month_collides() {
        let a = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2023, 7, 31).unwrap();
        let name = OsStr::new("dup.jpg");
        assert_eq!(
            resolve(Path::new("out"), &a, name),
            resolve(Path::new("out"), &b, name)
        );
    }
}

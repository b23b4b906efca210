use std::{
    fs::Metadata,
    io::{self, BufRead, Seek},
    path::Path,
};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Tag, Value};

use crate::error::MetadataError;

/// Readable, seekable file contents handed to a decoder.
pub trait MediaReader: BufRead + Seek {}

impl<T: BufRead + Seek> MediaReader for T {}

/// Anything that can pull a capture date out of a file's contents.
///
/// `Ok(None)` means the file simply carries no usable date; the caller falls
/// back to the modification time in both that case and the error case.
pub trait CaptureDateSource {
    fn capture_date(
        &self,
        name: &Path,
        reader: &mut dyn MediaReader,
    ) -> Result<Option<NaiveDateTime>, MetadataError>;
}

/// Tags consulted in order of preference.
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// EXIF-backed decoder. Files whose extension maps to a known non-image
/// type (video, audio, ...) are not opened as containers.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExifDecoder;

impl CaptureDateSource for ExifDecoder {
    fn capture_date(
        &self,
        name: &Path,
        mut reader: &mut dyn MediaReader,
    ) -> Result<Option<NaiveDateTime>, MetadataError> {
        if !probably_image(name) {
            return Ok(None);
        }

        let exif = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(None),
            Err(exif::Error::Io(source)) => return Err(MetadataError::Io { source }),
            Err(source) => return Err(MetadataError::Exif { source }),
        };

        for tag in DATE_TAGS {
            let Some(field) = exif.get_field(tag, In::PRIMARY) else {
                continue;
            };
            let Value::Ascii(ref values) = field.value else {
                continue;
            };
            let Some(raw) = values.first() else {
                continue;
            };
            if let Some(timestamp) = parse_exif_datetime(raw)? {
                return Ok(Some(timestamp));
            }
        }
        Ok(None)
    }
}

fn probably_image(name: &Path) -> bool {
    match mime_guess::from_path(name).first() {
        Some(mime) => mime.type_() == mime_guess::mime::IMAGE,
        None => true,
    }
}

/// Parses an EXIF `YYYY:MM:DD HH:MM:SS` value. Blank placeholders yield
/// `Ok(None)`.
fn parse_exif_datetime(raw: &[u8]) -> Result<Option<NaiveDateTime>, MetadataError> {
    let invalid = || MetadataError::InvalidDate {
        value: String::from_utf8_lossy(raw).into_owned(),
    };

    let dt = match exif::DateTime::from_ascii(raw) {
        Ok(dt) => dt,
        Err(exif::Error::BlankValue(_)) => return Ok(None),
        Err(_) => return Err(invalid()),
    };

    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(dt.hour),
                u32::from(dt.minute),
                u32::from(dt.second),
            )
        })
        .map(Some)
        .ok_or_else(invalid)
}

/// Modification time as local wall-clock time.
pub fn modified_time(metadata: &Metadata) -> io::Result<NaiveDateTime> {
    let modified = metadata.modified()?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

/// Test helpers that build a minimal JPEG carrying an EXIF date.
#[cfg(test)]
pub(crate) mod fixtures {
    /// SOI, one APP1 segment holding a big-endian TIFF block with IFD0 pointing
    /// at an Exif IFD that has a single `DateTimeOriginal` entry, then EOI.
    /// `date` must be exactly 19 bytes (`YYYY:MM:DD HH:MM:SS`).
    pub(crate) fn jpeg_with_date(date: &str) -> Vec<u8> {
        assert_eq!(date.len(), 19);
        let mut tiff: Vec<u8> = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2a\x00\x00\x00\x08");
        // IFD0: ExifIFDPointer -> 26
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x87, 0x69, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 26]);
        tiff.extend_from_slice(&[0, 0, 0, 0]);
        // Exif IFD: DateTimeOriginal, ASCII x 20 at offset 44
        tiff.extend_from_slice(&[0x00, 0x01]);
        tiff.extend_from_slice(&[0x90, 0x03, 0x00, 0x02, 0, 0, 0, 20, 0, 0, 0, 44]);
        tiff.extend_from_slice(&[0, 0, 0, 0]);
        tiff.extend_from_slice(date.as_bytes());
        tiff.push(0);

        let segment_len = u16::try_from(2 + 6 + tiff.len()).unwrap();
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\x00\x00");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn decode(name: &str, bytes: Vec<u8>) -> Result<Option<NaiveDateTime>, MetadataError> {
        let mut reader = Cursor::new(bytes);
        ExifDecoder.capture_date(Path::new(name), &mut reader)
    }

    #[test]
    fn reads_date_time_original() {
        let bytes = fixtures::jpeg_with_date("2022:01:01 10:30:00");
        let ts = decode("photo2.jpg", bytes).unwrap().unwrap();
        assert_eq!(ts.to_string(), "2022-01-01 10:30:00");
    }

    #[test]
    fn unrecognized_container_is_a_decode_error() {
        let result = decode("photo1.jpg", b"not really a jpeg".to_vec());
        assert!(matches!(
            result,
            Err(MetadataError::Exif {
                source: exif::Error::InvalidFormat(_)
            })
        ));
    }

    #[test]
    fn jpeg_without_exif_has_no_date() {
        assert_eq!(decode("bare.jpg", vec![0xFF, 0xD8, 0xFF, 0xD9]).unwrap(), None);
    }

    #[test]
    fn video_extension_is_not_decoded() {
        let bytes = fixtures::jpeg_with_date("2022:01:01 10:30:00");
        assert_eq!(decode("clip.mp4", bytes).unwrap(), None);
    }

    #[test]
    fn blank_date_is_absent() {
        assert_eq!(parse_exif_datetime(b"    :  :     :  :  ").unwrap(), None);
    }

    #[test]
    fn impossible_date_is_an_error() {
        let err = parse_exif_datetime(b"2022:13:45 10:00:00").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDate { .. }));
    }

    #[test]
    fn modified_time_follows_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"x").unwrap();
        // 2023-07-15 12:00:00 UTC lands mid-July in every timezone.
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_689_422_400, 0))
            .unwrap();
        let ts = modified_time(&std::fs::metadata(&path).unwrap()).unwrap();
        assert_eq!(crate::resolver::month_label(&ts), "2023-07");
    }
}

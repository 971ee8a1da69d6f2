//! Core data types for the rawdex indexing pipeline.
//!
//! These types hold what is gathered for one image and what ends up as a row
//! in the `image` table.

use std::fmt;

/// Unsigned TIFF rational as (numerator, denominator).
pub type Rational = (u32, u32);

/// Signed TIFF rational as (numerator, denominator).
pub type SRational = (i32, i32);

/// EXIF metadata gathered while a RAW file is prepared.
///
/// Every field defaults to zero or empty; tags missing from the file leave the
/// default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifProperties {
    pub artist: String,
    pub copyright: String,
    pub make: String,
    pub model: String,
    pub lens_model: String,
    pub exposure_time: Rational,
    /// Capture time in POSIX seconds
    pub timestamp: u64,
    pub aperture: f32,
    pub focal_length: f32,
    pub iso_speed: f32,
    pub exposure_program: u16,
    pub flash: u16,
}

impl fmt::Display for ExifProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "timestamp\t\t{}", self.timestamp)?;
        writeln!(f, "artist\t\t\t{}", self.artist)?;
        writeln!(f, "copyright\t\t{}", self.copyright)?;
        writeln!(f, "make\t\t\t{}", self.make)?;
        writeln!(f, "model\t\t\t{}", self.model)?;
        writeln!(f, "lens_model\t\t{}", self.lens_model)?;
        writeln!(
            f,
            "exposure_time\t\t{}/{}",
            self.exposure_time.0, self.exposure_time.1
        )?;
        writeln!(f, "f_number\t\t{}", self.aperture)?;
        writeln!(f, "exposure_program\t{}", self.exposure_program)?;
        writeln!(f, "iso_speed\t\t{}", self.iso_speed)?;
        writeln!(f, "flash\t\t\t{}", self.flash)?;
        write!(f, "focal_length\t\t{}", self.focal_length)
    }
}

/// Information read from a DOP sidecar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DopProperties {
    pub rank: i32,
}

/// One row of the `image` table.
#[derive(Debug, Clone, Copy)]
pub struct ImageRecord<'a> {
    pub filename: &'a str,
    pub project: &'a str,
    pub exif: &'a ExifProperties,
    pub dop: &'a DopProperties,
    /// JPEG-encoded preview
    pub preview: &'a [u8],
}

/// Cut a string at its first NUL character.
pub(crate) fn truncate_at_nul(value: &str) -> &str {
    match value.find('\0') {
        Some(pos) => &value[..pos],
        None => value,
    }
}

/// Remove trailing spaces, tabs, carriage returns and newlines in place.
pub(crate) fn trim_trailing_whitespace(value: &mut String) {
    let len = value.trim_end_matches(&[' ', '\n', '\r', '\t'][..]).len();
    value.truncate(len);
}

/// Text as stored in the database: first NUL-terminated segment, right-trimmed.
pub(crate) fn clean_text(value: &str) -> String {
    let mut text = truncate_at_nul(value).to_string();
    trim_trailing_whitespace(&mut text);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exif_defaults() {
        let exif = ExifProperties::default();
        assert!(exif.artist.is_empty());
        assert_eq!(exif.exposure_time, (0, 0));
        assert_eq!(exif.timestamp, 0);
        assert_eq!(exif.flash, 0);
        assert_eq!(DopProperties::default().rank, 0);
    }

    #[test]
    fn test_truncate_at_nul() {
        assert_eq!(truncate_at_nul("OLYMPUS\0CORPORATION"), "OLYMPUS");
        assert_eq!(truncate_at_nul("E-M5"), "E-M5");
        assert_eq!(truncate_at_nul("\0"), "");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        let mut value = String::from("Jane Doe \t\r\n");
        trim_trailing_whitespace(&mut value);
        assert_eq!(value, "Jane Doe");

        let mut blank = String::from("   ");
        trim_trailing_whitespace(&mut blank);
        assert_eq!(blank, "");

        let mut leading = String::from("  kept");
        trim_trailing_whitespace(&mut leading);
        assert_eq!(leading, "  kept");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("OLYMPUS IMAGING CORP.  \0junk"), "OLYMPUS IMAGING CORP.");
    }

    #[test]
    fn test_display_lists_every_field() {
        let exif = ExifProperties {
            exposure_time: (1, 250),
            ..Default::default()
        };
        let dump = exif.to_string();
        assert!(dump.contains("exposure_time\t\t1/250"));
        assert_eq!(dump.lines().count(), 12);
    }
}

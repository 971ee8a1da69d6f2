//! Tag routing from the RAW decoder's callback into [`ExifProperties`].

use super::field::{read_single_ascii, read_single_rational, read_single_short};
use super::{ExifVisitor, TagField};
use crate::types::{trim_trailing_whitespace, ExifProperties};

pub const TAG_COPYRIGHT: u32 = 0x8298;
/// Copyright as reported from a maker-specific IFD.
pub const TAG_COPYRIGHT_ALT: u32 = 0x10_8298;
pub const TAG_EXPOSURE_TIME: u32 = 0x829A;
pub const TAG_EXPOSURE_PROGRAM: u32 = 0x8822;
pub const TAG_FLASH: u32 = 0x9209;
pub const TAG_LENS_MODEL: u32 = 0xA434;

impl ExifVisitor for ExifProperties {
    fn visit_tag(&mut self, field: &mut TagField<'_>) {
        match field.tag {
            TAG_COPYRIGHT | TAG_COPYRIGHT_ALT => match read_single_ascii(field) {
                Ok(mut value) => {
                    trim_trailing_whitespace(&mut value);
                    self.copyright = value;
                }
                Err(e) => {
                    self.copyright.clear();
                    tracing::warn!(tag = field.tag, "Unexpected value for copyright: {e}");
                }
            },

            TAG_EXPOSURE_PROGRAM => match read_single_short(field) {
                Ok(value) => self.exposure_program = value,
                Err(e) => tracing::warn!("Unexpected value for exposure program: {e}"),
            },

            TAG_EXPOSURE_TIME => match read_single_rational(field) {
                Ok(value) => self.exposure_time = value,
                Err(e) => tracing::warn!("Unexpected value for exposure time: {e}"),
            },

            TAG_FLASH => match read_single_short(field) {
                Ok(value) => self.flash = value,
                Err(e) => tracing::warn!("Unexpected value for flash: {e}"),
            },

            TAG_LENS_MODEL => match read_single_ascii(field) {
                Ok(mut value) => {
                    trim_trailing_whitespace(&mut value);
                    self.lens_model = value;
                }
                Err(e) => {
                    self.lens_model.clear();
                    tracing::warn!("Unexpected value for lens model: {e}");
                }
            },

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::{TiffType, BYTE_ORDER_BIG_ENDIAN, BYTE_ORDER_LITTLE_ENDIAN};
    use std::io::Cursor;

    fn visit(exif: &mut ExifProperties, tag: u32, ty: TiffType, count: usize, order: u16, bytes: &[u8]) {
        let mut cursor = Cursor::new(bytes.to_vec());
        let mut field = TagField {
            tag,
            type_code: ty.code(),
            count,
            byte_order: order,
            data: &mut cursor,
        };
        exif.visit_tag(&mut field);
    }

    #[test]
    fn test_copyright_is_trimmed() {
        let mut exif = ExifProperties::default();
        let text = b"(c) Jane Doe   \0";
        visit(&mut exif, TAG_COPYRIGHT, TiffType::Ascii, text.len(), BYTE_ORDER_LITTLE_ENDIAN, text);
        assert_eq!(exif.copyright, "(c) Jane Doe");

        let text = b"Other\t\n\0";
        visit(&mut exif, TAG_COPYRIGHT_ALT, TiffType::Ascii, text.len(), BYTE_ORDER_BIG_ENDIAN, text);
        assert_eq!(exif.copyright, "Other");
    }

    #[test]
    fn test_shorts_and_rational() {
        let mut exif = ExifProperties::default();
        visit(&mut exif, TAG_EXPOSURE_PROGRAM, TiffType::Short, 1, BYTE_ORDER_BIG_ENDIAN, &[0, 3]);
        visit(&mut exif, TAG_FLASH, TiffType::Short, 1, BYTE_ORDER_LITTLE_ENDIAN, &[0x10, 0]);

        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&4000u32.to_le_bytes());
        visit(&mut exif, TAG_EXPOSURE_TIME, TiffType::Rational, 1, BYTE_ORDER_LITTLE_ENDIAN, &bytes);

        assert_eq!(exif.exposure_program, 3);
        assert_eq!(exif.flash, 0x10);
        assert_eq!(exif.exposure_time, (10, 4000));
    }

    #[test]
    fn test_lens_model() {
        let mut exif = ExifProperties::default();
        let text = b"OLYMPUS M.12-40mm F2.8\0";
        visit(&mut exif, TAG_LENS_MODEL, TiffType::Ascii, text.len(), BYTE_ORDER_LITTLE_ENDIAN, text);
        assert_eq!(exif.lens_model, "OLYMPUS M.12-40mm F2.8");

        let text = b"M.Zuiko 12-40mm  \t\0";
        visit(&mut exif, TAG_LENS_MODEL, TiffType::Ascii, text.len(), BYTE_ORDER_BIG_ENDIAN, text);
        assert_eq!(exif.lens_model, "M.Zuiko 12-40mm");
    }

    #[test]
    fn test_failures_keep_defaults() {
        let mut exif = ExifProperties::default();
        // LONG where SHORT is expected.
        visit(&mut exif, TAG_FLASH, TiffType::Long, 1, BYTE_ORDER_LITTLE_ENDIAN, &[1, 0, 0, 0]);
        // Unknown byte order.
        visit(&mut exif, TAG_EXPOSURE_PROGRAM, TiffType::Short, 1, 0, &[0, 2]);
        assert_eq!(exif, ExifProperties::default());
    }

    #[test]
    fn test_ascii_failure_clears_field() {
        let mut exif = ExifProperties {
            lens_model: "stale".into(),
            ..Default::default()
        };
        visit(&mut exif, TAG_LENS_MODEL, TiffType::Byte, 3, BYTE_ORDER_LITTLE_ENDIAN, b"abc");
        assert!(exif.lens_model.is_empty());
    }

    #[test]
    fn test_other_tags_ignored() {
        let mut exif = ExifProperties::default();
        visit(&mut exif, 0x010F, TiffType::Ascii, 8, BYTE_ORDER_LITTLE_ENDIAN, b"OLYMPUS\0");
        assert_eq!(exif, ExifProperties::default());
    }
}

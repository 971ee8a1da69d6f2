//! Walking the TIFF/ORF directory structure of a RAW file.
//!
//! Every entry of IFD0, the IFDs chained after it and the EXIF sub-IFD is
//! handed to an [`ExifVisitor`] with a stream positioned at the entry's data.
//! The same pass fills the camera properties that the pipeline reads after
//! unpacking.

use std::collections::HashSet;
use std::io::Cursor;

use chrono::NaiveDateTime;

use crate::error::{FieldError, RawError};
use crate::exif::field::{read_single_ascii, read_single_long, read_single_rational, read_single_short};
use crate::exif::{ExifVisitor, TagField, TiffType, BYTE_ORDER_BIG_ENDIAN, BYTE_ORDER_LITTLE_ENDIAN};

use super::RawProperties;

/// Standard TIFF magic
pub const MAGIC_TIFF: u16 = 42;
/// Olympus ORF magic ("RO")
pub const MAGIC_ORF: u16 = 0x4F52;
/// Olympus ORF magic used by some models ("RS")
pub const MAGIC_ORF_ALT: u16 = 0x5352;

pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_DATE_TIME: u16 = 0x0132;
pub const TAG_ARTIST: u16 = 0x013B;
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_F_NUMBER: u16 = 0x829D;
pub const TAG_ISO_SPEED: u16 = 0x8827;
pub const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const TAG_FOCAL_LENGTH: u16 = 0x920A;

const HEADER_SIZE: usize = 8;
const ENTRY_SIZE: usize = 12;
/// Upper bound on directories visited in one file
const MAX_IFDS: usize = 64;

/// Byte order of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn marker(self) -> u16 {
        match self {
            Endian::Little => BYTE_ORDER_LITTLE_ENDIAN,
            Endian::Big => BYTE_ORDER_BIG_ENDIAN,
        }
    }

    fn u16_at(self, data: &[u8], offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    fn u32_at(self, data: &[u8], offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }
}

/// Parsed 8-byte container header.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub endian: Endian,
    pub magic: u16,
    pub ifd_offset: u32,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, RawError> {
        if data.len() < HEADER_SIZE {
            return Err(RawError::Container(format!(
                "file is {} bytes, shorter than a TIFF header",
                data.len()
            )));
        }
        let endian = match &data[0..2] {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            other => {
                return Err(RawError::Container(format!(
                    "unknown byte order {:02x}{:02x}",
                    other[0], other[1]
                )))
            }
        };
        let magic = endian.u16_at(data, 2).unwrap_or_default();
        if !matches!(magic, MAGIC_TIFF | MAGIC_ORF | MAGIC_ORF_ALT) {
            return Err(RawError::Container(format!("unknown magic {magic:#06x}")));
        }
        let ifd_offset = endian.u32_at(data, 4).unwrap_or_default();
        Ok(Self {
            endian,
            magic,
            ifd_offset,
        })
    }
}

/// Walk all directories of `data`, reporting every entry to `visitor` and
/// filling `properties`.
///
/// Entries with unknown types or data outside the file are skipped.
pub fn walk(
    data: &[u8],
    visitor: &mut dyn ExifVisitor,
    properties: &mut RawProperties,
) -> Result<(), RawError> {
    let header = Header::parse(data)?;
    let mut pending = vec![header.ifd_offset as usize];
    let mut visited = HashSet::new();
    let mut original_time = None;
    let mut fallback_time = None;

    while let Some(offset) = pending.pop() {
        if offset == 0 || !visited.insert(offset) || visited.len() > MAX_IFDS {
            continue;
        }
        let Some(count) = header.endian.u16_at(data, offset) else {
            tracing::debug!(offset, "IFD offset outside the file");
            continue;
        };

        for index in 0..count as usize {
            let entry_offset = offset + 2 + index * ENTRY_SIZE;
            let Some(entry) = Entry::parse(data, header.endian, entry_offset) else {
                break;
            };
            let Some(value) = entry.value(data) else {
                tracing::trace!(tag = entry.tag, "Skipping entry with unreadable data");
                continue;
            };

            let mut cursor = Cursor::new(value);
            visitor.visit_tag(&mut entry.field(header.endian, &mut cursor));

            let mut cursor = Cursor::new(value);
            let mut field = entry.field(header.endian, &mut cursor);
            let result = match entry.tag {
                TAG_MAKE => read_single_ascii(&mut field).map(|v| properties.make = v),
                TAG_MODEL => read_single_ascii(&mut field).map(|v| properties.model = v),
                TAG_ARTIST => read_single_ascii(&mut field).map(|v| properties.artist = v),
                TAG_ISO_SPEED => read_iso(&mut field).map(|v| properties.iso_speed = v),
                TAG_F_NUMBER => read_ratio(&mut field).map(|v| properties.aperture = v),
                TAG_FOCAL_LENGTH => read_ratio(&mut field).map(|v| properties.focal_length = v),
                TAG_DATE_TIME_ORIGINAL => read_single_ascii(&mut field).map(|v| original_time = Some(v)),
                TAG_DATE_TIME => read_single_ascii(&mut field).map(|v| fallback_time = Some(v)),
                TAG_EXIF_IFD => read_single_long(&mut field).map(|v| pending.push(v as usize)),
                _ => Ok(()),
            };
            if let Err(e) = result {
                tracing::debug!(tag = entry.tag, "Unexpected value for camera property: {e}");
            }
        }

        let next_offset = offset + 2 + count as usize * ENTRY_SIZE;
        if let Some(next) = header.endian.u32_at(data, next_offset) {
            pending.push(next as usize);
        }
    }

    if let Some(timestamp) = original_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| fallback_time.as_deref().and_then(parse_timestamp))
    {
        properties.timestamp = timestamp;
    }
    Ok(())
}

/// Parse an EXIF date (`YYYY:MM:DD HH:MM:SS`) as UTC POSIX seconds.
pub fn parse_timestamp(text: &str) -> Option<u64> {
    let text = text.trim_end_matches(&['\0', ' '][..]);
    let time = NaiveDateTime::parse_from_str(text, "%Y:%m:%d %H:%M:%S").ok()?;
    u64::try_from(time.and_utc().timestamp()).ok()
}

fn read_ratio(field: &mut TagField<'_>) -> Result<f32, FieldError> {
    let (n, d) = read_single_rational(field)?;
    Ok(if d == 0 { 0.0 } else { n as f32 / d as f32 })
}

fn read_iso(field: &mut TagField<'_>) -> Result<f32, FieldError> {
    if field.type_code == TiffType::Long.code() {
        read_single_long(field).map(|v| v as f32)
    } else {
        read_single_short(field).map(f32::from)
    }
}

/// One 12-byte directory entry.
struct Entry {
    tag: u16,
    type_code: u16,
    count: u32,
    /// Offset of the 4-byte value/offset slot
    slot: usize,
    endian: Endian,
}

impl Entry {
    fn parse(data: &[u8], endian: Endian, offset: usize) -> Option<Self> {
        Some(Self {
            tag: endian.u16_at(data, offset)?,
            type_code: endian.u16_at(data, offset + 2)?,
            count: endian.u32_at(data, offset + 4)?,
            slot: offset + 8,
            endian,
        })
    }

    /// The bytes holding this entry's elements.
    fn value<'d>(&self, data: &'d [u8]) -> Option<&'d [u8]> {
        let size = TiffType::from_code(self.type_code)?
            .size()
            .checked_mul(self.count as usize)?;
        let start = if size <= 4 {
            self.slot
        } else {
            self.endian.u32_at(data, self.slot)? as usize
        };
        data.get(start..start.checked_add(size)?)
    }

    fn field<'c>(&self, endian: Endian, cursor: &'c mut Cursor<&[u8]>) -> TagField<'c> {
        TagField {
            tag: u32::from(self.tag),
            type_code: self.type_code,
            count: self.count as usize,
            byte_order: endian.marker(),
            data: cursor,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::ExifProperties;

    /// Little-endian TIFF writer for tests.
    pub(crate) struct TiffBuilder {
        entries: Vec<(u16, u16, u32, Vec<u8>)>,
        exif_entries: Vec<(u16, u16, u32, Vec<u8>)>,
        magic: u16,
    }

    impl TiffBuilder {
        pub(crate) fn new() -> Self {
            Self {
                entries: Vec::new(),
                exif_entries: Vec::new(),
                magic: MAGIC_ORF,
            }
        }

        pub(crate) fn ascii(mut self, tag: u16, text: &str) -> Self {
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0);
            self.entries.push((tag, 2, bytes.len() as u32, bytes));
            self
        }

        pub(crate) fn exif_short(mut self, tag: u16, value: u16) -> Self {
            self.exif_entries.push((tag, 3, 1, value.to_le_bytes().to_vec()));
            self
        }

        pub(crate) fn exif_ascii(mut self, tag: u16, text: &str) -> Self {
            let mut bytes = text.as_bytes().to_vec();
            bytes.push(0);
            self.exif_entries.push((tag, 2, bytes.len() as u32, bytes));
            self
        }

        pub(crate) fn exif_rational(mut self, tag: u16, n: u32, d: u32) -> Self {
            let mut bytes = n.to_le_bytes().to_vec();
            bytes.extend_from_slice(&d.to_le_bytes());
            self.exif_entries.push((tag, 5, 1, bytes));
            self
        }

        fn write_ifd(out: &mut Vec<u8>, entries: &[(u16, u16, u32, Vec<u8>)], link: Option<usize>) {
            let start = out.len();
            let entry_count = entries.len() + usize::from(link.is_some());
            let mut data_offset = start + 2 + entry_count * ENTRY_SIZE + 4;
            let mut table = Vec::new();
            let mut blob = Vec::new();

            let mut all: Vec<(u16, u16, u32, Vec<u8>)> = entries.to_vec();
            if let Some(target) = link {
                all.push((TAG_EXIF_IFD, 4, 1, (target as u32).to_le_bytes().to_vec()));
            }
            all.sort_by_key(|e| e.0);

            for (tag, ty, count, bytes) in &all {
                table.extend_from_slice(&tag.to_le_bytes());
                table.extend_from_slice(&ty.to_le_bytes());
                table.extend_from_slice(&count.to_le_bytes());
                if bytes.len() <= 4 {
                    let mut slot = bytes.clone();
                    slot.resize(4, 0);
                    table.extend_from_slice(&slot);
                } else {
                    table.extend_from_slice(&(data_offset as u32).to_le_bytes());
                    blob.extend_from_slice(bytes);
                    data_offset += bytes.len();
                }
            }

            out.extend_from_slice(&(entry_count as u16).to_le_bytes());
            out.extend_from_slice(&table);
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&blob);
        }

        pub(crate) fn build(self) -> Vec<u8> {
            let mut out = b"II".to_vec();
            out.extend_from_slice(&self.magic.to_le_bytes());
            out.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes());

            // The EXIF IFD goes after IFD0; compute its offset from IFD0's size.
            let link_count = usize::from(!self.exif_entries.is_empty());
            let ifd0_entries = self.entries.len() + link_count;
            let ifd0_blob: usize = self.entries.iter().filter(|e| e.3.len() > 4).map(|e| e.3.len()).sum();
            let exif_offset = HEADER_SIZE + 2 + ifd0_entries * ENTRY_SIZE + 4 + ifd0_blob;

            let link = (link_count == 1).then_some(exif_offset);
            Self::write_ifd(&mut out, &self.entries, link);
            if link.is_some() {
                Self::write_ifd(&mut out, &self.exif_entries, None);
            }
            out
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<u32>);

    impl ExifVisitor for Recorder {
        fn visit_tag(&mut self, field: &mut TagField<'_>) {
            self.0.push(field.tag);
        }
    }

    fn sample() -> Vec<u8> {
        TiffBuilder::new()
            .ascii(TAG_MAKE, "OLYMPUS IMAGING CORP.  ")
            .ascii(TAG_MODEL, "E-M5")
            .ascii(TAG_ARTIST, "Jane Doe")
            .ascii(TAG_DATE_TIME, "2020:01:01 00:00:00")
            .exif_short(TAG_ISO_SPEED, 200)
            .exif_rational(TAG_F_NUMBER, 28, 10)
            .exif_rational(TAG_FOCAL_LENGTH, 12, 1)
            .exif_rational(0x829A, 1, 250)
            .exif_ascii(TAG_DATE_TIME_ORIGINAL, "2013:06:15 10:30:00")
            .exif_short(0x9209, 16)
            .build()
    }

    #[test]
    fn test_header() {
        let data = sample();
        let header = Header::parse(&data).unwrap();
        assert_eq!(header.endian, Endian::Little);
        assert_eq!(header.magic, MAGIC_ORF);
        assert_eq!(header.ifd_offset, 8);

        assert!(Header::parse(b"II").is_err());
        assert!(Header::parse(b"XX*\0\x08\0\0\0").is_err());
        assert!(Header::parse(b"II\x2b\0\x08\0\0\0").is_err());
        assert!(Header::parse(b"MM\0\x2a\0\0\0\x08").is_ok());
    }

    #[test]
    fn test_walk_fills_properties() {
        let mut props = RawProperties::default();
        walk(&sample(), &mut Recorder::default(), &mut props).unwrap();
        assert_eq!(props.make, "OLYMPUS IMAGING CORP.  ");
        assert_eq!(props.model, "E-M5");
        assert_eq!(props.artist, "Jane Doe");
        assert_eq!(props.iso_speed, 200.0);
        assert!((props.aperture - 2.8).abs() < 1e-6);
        assert_eq!(props.focal_length, 12.0);
        // DateTimeOriginal wins over DateTime.
        assert_eq!(props.timestamp, 1_371_292_200);
    }

    #[test]
    fn test_walk_visits_exif_sub_ifd() {
        let mut recorder = Recorder::default();
        walk(&sample(), &mut recorder, &mut RawProperties::default()).unwrap();
        assert!(recorder.0.contains(&u32::from(TAG_MAKE)));
        assert!(recorder.0.contains(&u32::from(TAG_EXIF_IFD)));
        assert!(recorder.0.contains(&0x829A));
        assert!(recorder.0.contains(&0x9209));
    }

    #[test]
    fn test_walk_feeds_exif_properties() {
        let mut exif = ExifProperties::default();
        walk(&sample(), &mut exif, &mut RawProperties::default()).unwrap();
        assert_eq!(exif.exposure_time, (1, 250));
        assert_eq!(exif.flash, 16);
    }

    #[test]
    fn test_walk_survives_truncation() {
        let data = sample();
        let truncated = &data[..data.len() - 10];
        let mut props = RawProperties::default();
        walk(truncated, &mut Recorder::default(), &mut props).unwrap();
        assert_eq!(props.model, "E-M5");
    }

    #[test]
    fn test_walk_stops_on_ifd_loop() {
        // One entry-less IFD whose next pointer leads back to itself.
        let mut data = b"II\x2a\0\x08\0\0\0".to_vec();
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&8u32.to_le_bytes());
        walk(&data, &mut Recorder::default(), &mut RawProperties::default()).unwrap();
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970:01:01 00:00:10"), Some(10));
        assert_eq!(parse_timestamp("2013:06:15 10:30:00\0"), Some(1_371_292_200));
        assert_eq!(parse_timestamp("    :  :     :  :  "), None);
        assert_eq!(parse_timestamp("1969:12:31 23:59:59"), None);
    }
}

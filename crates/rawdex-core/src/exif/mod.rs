//! EXIF handling on top of a RAW decoder's tag callback.
//!
//! - **field**: typed readers for TIFF field values with byte-order handling
//! - **tags**: routes the tags rawdex cares about into [`ExifProperties`]
//!
//! [`ExifProperties`]: crate::types::ExifProperties

pub mod field;
pub mod tags;

pub use field::{TagField, TiffType, BYTE_ORDER_BIG_ENDIAN, BYTE_ORDER_LITTLE_ENDIAN};

/// Receives every tag a RAW decoder encounters while opening a file.
pub trait ExifVisitor {
    /// Called once per tag. Failures are handled by the visitor itself.
    fn visit_tag(&mut self, field: &mut TagField<'_>);
}

//! RAW decoding service.
//!
//! The pipeline talks to RAW decoders through [`RawDecoder`], which follows
//! the life cycle of one image: open, unpack, read properties, release the
//! input stream, develop, hand out the image, recycle. A decoder instance is
//! reused for many images but handles only one at a time.
//!
//! [`RawloaderDecoder`] is the implementation used by the binary.

mod develop;
mod loader;
pub mod tiff;

use std::path::Path;

use crate::error::RawError;
use crate::exif::ExifVisitor;

pub use loader::RawloaderDecoder;
pub use develop::{develop, SensorData};

/// Properties the decoder exposes after unpacking.
///
/// Text fields are raw: they may contain NULs and trailing whitespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProperties {
    pub make: String,
    pub model: String,
    pub artist: String,
    pub iso_speed: f32,
    pub aperture: f32,
    pub focal_length: f32,
    /// Capture time in POSIX seconds
    pub timestamp: u64,
}

/// What [`RawDecoder::make_image`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Bitmap,
    Jpeg,
}

/// An owned image handed out by the decoder.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    /// Samples per pixel
    pub colors: u16,
    /// Bits per sample
    pub bits: u16,
    /// Interleaved samples; 16-bit samples are in native byte order
    pub data: Vec<u8>,
}

/// A reusable RAW decoder.
pub trait RawDecoder: Send {
    /// Open `path` and parse its container, calling `visitor` for each tag.
    fn open_file(&mut self, path: &Path, visitor: &mut dyn ExifVisitor) -> Result<(), RawError>;

    /// Decode the sensor data of the open file.
    fn unpack(&mut self) -> Result<(), RawError>;

    /// Properties read while opening and unpacking.
    fn properties(&self) -> &RawProperties;

    /// Release the input stream once it is no longer needed.
    fn recycle_datastream(&mut self);

    /// Develop the unpacked sensor data into an image.
    fn process(&mut self) -> Result<(), RawError>;

    /// Hand out the developed image.
    fn make_image(&mut self) -> Result<DecodedImage, RawError>;

    /// Drop all per-image state.
    fn recycle(&mut self);
}

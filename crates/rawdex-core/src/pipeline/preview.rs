//! Preview rendering: bounded bilinear resize followed by JPEG encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use std::path::Path;

use crate::config::PreviewConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::raw::DecodedImage;

/// Preview dimensions for a `width` × `height` image whose longest edge must
/// not exceed `max_dimension`.
///
/// Both sides are multiplied by `max_dimension / max(width, height)` and
/// truncated, never dropping below one pixel.
pub fn scaled_image_size(width: u32, height: u32, max_dimension: u32) -> (u16, u16) {
    let longest = width.max(height).max(1);
    let scale = max_dimension as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale) as u16).max(1);
    (scaled(width), scaled(height))
}

/// Renders decoded images into JPEG previews.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    config: PreviewConfig,
}

impl PreviewRenderer {
    /// Create a new preview renderer with the given configuration.
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    /// Resize `decoded` and encode it as JPEG into `out`, which is cleared
    /// first.
    ///
    /// Grey and RGB images with 8 or 16 bits per sample are supported; any
    /// other layout is [`PipelineError::UnsupportedPixelFormat`].
    pub fn render(&self, path: &Path, decoded: &DecodedImage, out: &mut Vec<u8>) -> PipelineResult<()> {
        out.clear();

        let unsupported = || PipelineError::UnsupportedPixelFormat {
            path: path.to_path_buf(),
            colors: decoded.colors,
            bits: decoded.bits,
        };
        let (w, h) = (decoded.width, decoded.height);
        let source = match (decoded.colors, decoded.bits) {
            (1, 8) => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, decoded.data.clone())
                .map(DynamicImage::ImageLuma8),
            (1, 16) => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, native_u16(&decoded.data))
                .map(DynamicImage::ImageLuma16),
            (3, 8) => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, decoded.data.clone())
                .map(DynamicImage::ImageRgb8),
            (3, 16) => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, native_u16(&decoded.data))
                .map(DynamicImage::ImageRgb16),
            _ => return Err(unsupported()),
        };
        let source = source.ok_or_else(|| PipelineError::Encode {
            path: path.to_path_buf(),
            message: format!(
                "{} bytes do not fill a {w}x{h} image",
                decoded.data.len()
            ),
        })?;

        let (dst_w, dst_h) = scaled_image_size(w, h, self.config.max_dimension);
        let resized = source.resize_exact(dst_w.into(), dst_h.into(), FilterType::Triangle);

        // JPEG carries 8-bit samples; wider samples are narrowed after resizing.
        let target = if decoded.colors == 1 {
            DynamicImage::ImageLuma8(resized.to_luma8())
        } else {
            DynamicImage::ImageRgb8(resized.to_rgb8())
        };

        let encoder = JpegEncoder::new_with_quality(&mut *out, self.config.jpeg_quality);
        target
            .write_with_encoder(encoder)
            .map_err(|e| PipelineError::Encode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

fn native_u16(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect()
}

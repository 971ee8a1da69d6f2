//! Turning unpacked sensor samples into a 16-bit bitmap.
//!
//! Bayer data is demosaiced by collapsing each 2×2 block into one pixel, which
//! halves both dimensions. Previews are far smaller than the sensor, so the
//! lost resolution never shows.

use super::{DecodedImage, ImageKind};
use crate::error::RawError;

const GAMMA: f32 = 1.0 / 2.2;

/// Unpacked sensor data and the levels needed to develop it.
#[derive(Debug, Clone)]
pub struct SensorData {
    pub width: usize,
    pub height: usize,
    /// Components per pixel: 1 for mosaic or monochrome, 3 for linear RGB
    pub cpp: usize,
    pub samples: Vec<f32>,
    /// Per-colour black levels
    pub black: [f32; 4],
    /// Per-colour white levels
    pub white: [f32; 4],
    /// Camera white balance multipliers, any scale
    pub wb: [f32; 4],
    /// Margins to drop: top, right, bottom, left
    pub crops: [usize; 4],
    /// Colour at each position of a 2×2 block anchored at the crop origin,
    /// row-major; `None` for monochrome sensors
    pub cfa: Option<[usize; 4]>,
}

/// Develop sensor data into an RGB (or grey) bitmap with 16 bits per sample.
pub fn develop(sensor: &SensorData) -> Result<DecodedImage, RawError> {
    let [top, right, bottom, left] = sensor.crops;
    let width = sensor.width.saturating_sub(left + right);
    let height = sensor.height.saturating_sub(top + bottom);
    if width == 0 || height == 0 {
        return Err(RawError::Decoder("image is empty after cropping".into()));
    }
    let expected = sensor.width * sensor.height * sensor.cpp;
    if sensor.samples.len() < expected {
        return Err(RawError::Decoder(format!(
            "expected {expected} samples, found {}",
            sensor.samples.len()
        )));
    }

    let levels = Levels::new(sensor);
    match (sensor.cpp, sensor.cfa) {
        (1, Some(cfa)) => superpixel(sensor, &levels, cfa, width, height),
        (1, None) => Ok(monochrome(sensor, &levels, width, height)),
        (3, _) => Ok(linear_rgb(sensor, &levels, width, height)),
        (cpp, _) => Err(RawError::Decoder(format!(
            "unsupported component count {cpp}"
        ))),
    }
}

/// Per-colour normalisation and white balance.
struct Levels {
    black: [f32; 4],
    range: [f32; 4],
    wb: [f32; 4],
}

impl Levels {
    fn new(sensor: &SensorData) -> Self {
        let mut range = [1.0; 4];
        for c in 0..4 {
            let span = sensor.white[c] - sensor.black[c];
            range[c] = if span > 0.0 { span } else { 1.0 };
        }

        let valid = |v: f32| v.is_finite() && v > 0.0;
        let green = if valid(sensor.wb[1]) { sensor.wb[1] } else { 1.0 };
        let mut wb = [1.0; 4];
        for c in 0..4 {
            if valid(sensor.wb[c]) {
                wb[c] = sensor.wb[c] / green;
            }
        }
        // Second green shares the first's multiplier when the camera omits it.
        if !valid(sensor.wb[3]) {
            wb[3] = wb[1];
        }

        Self {
            black: sensor.black,
            range,
            wb,
        }
    }

    /// Linear value in 0..=1 for a sample of colour `c`.
    fn linear(&self, c: usize, sample: f32) -> f32 {
        let v = (sample - self.black[c]) / self.range[c] * self.wb[c];
        v.clamp(0.0, 1.0)
    }
}

fn encode(linear: f32) -> u16 {
    (linear.powf(GAMMA) * 65535.0).round() as u16
}

fn push_sample(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_ne_bytes());
}

fn superpixel(
    sensor: &SensorData,
    levels: &Levels,
    cfa: [usize; 4],
    width: usize,
    height: usize,
) -> Result<DecodedImage, RawError> {
    let (out_w, out_h) = (width / 2, height / 2);
    if out_w == 0 || out_h == 0 {
        return Err(RawError::Decoder("mosaic smaller than one 2×2 block".into()));
    }
    let [top, _, _, left] = sensor.crops;
    let mut data = Vec::with_capacity(out_w * out_h * 3 * 2);

    for y in 0..out_h {
        for x in 0..out_w {
            let mut sum = [0.0f32; 3];
            let mut count = [0u32; 3];
            for (i, &colour) in cfa.iter().enumerate() {
                let row = top + 2 * y + i / 2;
                let col = left + 2 * x + i % 2;
                let sample = sensor.samples[row * sensor.width + col];
                // Colour 3 is the second green of RGBG sensors.
                let channel = if colour >= 3 { 1 } else { colour };
                sum[channel] += levels.linear(colour.min(3), sample);
                count[channel] += 1;
            }
            for c in 0..3 {
                let value = if count[c] > 0 { sum[c] / count[c] as f32 } else { 0.0 };
                push_sample(&mut data, encode(value));
            }
        }
    }

    Ok(DecodedImage {
        kind: ImageKind::Bitmap,
        width: out_w as u32,
        height: out_h as u32,
        colors: 3,
        bits: 16,
        data,
    })
}

fn monochrome(sensor: &SensorData, levels: &Levels, width: usize, height: usize) -> DecodedImage {
    let [top, _, _, left] = sensor.crops;
    let mut data = Vec::with_capacity(width * height * 2);
    for row in top..top + height {
        for col in left..left + width {
            let sample = sensor.samples[row * sensor.width + col];
            push_sample(&mut data, encode(levels.linear(0, sample)));
        }
    }
    DecodedImage {
        kind: ImageKind::Bitmap,
        width: width as u32,
        height: height as u32,
        colors: 1,
        bits: 16,
        data,
    }
}

fn linear_rgb(sensor: &SensorData, levels: &Levels, width: usize, height: usize) -> DecodedImage {
    let [top, _, _, left] = sensor.crops;
    let mut data = Vec::with_capacity(width * height * 3 * 2);
    for row in top..top + height {
        for col in left..left + width {
            let base = (row * sensor.width + col) * 3;
            for c in 0..3 {
                let sample = sensor.samples[base + c];
                push_sample(&mut data, encode(levels.linear(c, sample)));
            }
        }
    }
    DecodedImage {
        kind: ImageKind::Bitmap,
        width: width as u32,
        height: height as u32,
        colors: 3,
        bits: 16,
        data,
    }
}

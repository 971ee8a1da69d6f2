//! [`RawDecoder`] backed by the `rawloader` crate.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use rawloader::{RawImage, RawImageData};

use super::{develop, tiff, DecodedImage, RawDecoder, RawProperties, SensorData};
use crate::error::RawError;
use crate::exif::ExifVisitor;

/// Reusable decoder that reads the container itself and lets `rawloader`
/// decode the sensor data.
#[derive(Default)]
pub struct RawloaderDecoder {
    path: Option<PathBuf>,
    /// File contents between `open_file` and `recycle_datastream`
    stream: Vec<u8>,
    raw: Option<RawImage>,
    developed: Option<DecodedImage>,
    properties: RawProperties,
}

impl RawloaderDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RawDecoder for RawloaderDecoder {
    fn open_file(&mut self, path: &Path, visitor: &mut dyn ExifVisitor) -> Result<(), RawError> {
        self.recycle();
        self.stream = std::fs::read(path).map_err(|source| RawError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.path = Some(path.to_path_buf());
        // Keep the stream even when the container walk fails; rawloader may
        // still recognise the file.
        tiff::walk(&self.stream, visitor, &mut self.properties)
    }

    fn unpack(&mut self) -> Result<(), RawError> {
        if self.path.is_none() {
            return Err(RawError::OutOfOrder("unpack before open_file"));
        }
        if self.stream.is_empty() {
            return Err(RawError::OutOfOrder("unpack after recycle_datastream"));
        }
        let raw = rawloader::decode(&mut Cursor::new(&self.stream[..]))
            .map_err(|e| RawError::Decoder(format!("{e:?}")))?;

        if !raw.clean_make.is_empty() {
            self.properties.make = raw.clean_make.clone();
        }
        if !raw.clean_model.is_empty() {
            self.properties.model = raw.clean_model.clone();
        }
        tracing::trace!(
            make = %raw.make,
            model = %raw.model,
            width = raw.width,
            height = raw.height,
            cpp = raw.cpp,
            "Unpacked sensor data"
        );
        self.raw = Some(raw);
        Ok(())
    }

    fn properties(&self) -> &RawProperties {
        &self.properties
    }

    fn recycle_datastream(&mut self) {
        self.stream = Vec::new();
    }

    fn process(&mut self) -> Result<(), RawError> {
        let raw = self
            .raw
            .as_ref()
            .ok_or(RawError::OutOfOrder("process before unpack"))?;
        self.developed = Some(develop(&sensor_data(raw))?);
        Ok(())
    }

    fn make_image(&mut self) -> Result<DecodedImage, RawError> {
        self.developed
            .take()
            .ok_or(RawError::OutOfOrder("make_image before process"))
    }

    fn recycle(&mut self) {
        self.path = None;
        self.stream = Vec::new();
        self.raw = None;
        self.developed = None;
        self.properties = RawProperties::default();
    }
}

fn sensor_data(raw: &RawImage) -> SensorData {
    let samples = match &raw.data {
        RawImageData::Integer(values) => values.iter().map(|&v| f32::from(v)).collect(),
        RawImageData::Float(values) => values.clone(),
    };

    // Float data is already normalised; integer data uses the camera's levels.
    let (black, white) = match raw.data {
        RawImageData::Integer(_) => (
            raw.blacklevels.map(f32::from),
            raw.whitelevels.map(f32::from),
        ),
        RawImageData::Float(_) => ([0.0; 4], [1.0; 4]),
    };

    let cfa = (raw.cpp == 1 && raw.cfa.width > 0 && raw.cfa.height > 0).then(|| {
        let [top, _, _, left] = raw.crops;
        [
            raw.cfa.color_at(top, left),
            raw.cfa.color_at(top, left + 1),
            raw.cfa.color_at(top + 1, left),
            raw.cfa.color_at(top + 1, left + 1),
        ]
    });

    SensorData {
        width: raw.width,
        height: raw.height,
        cpp: raw.cpp,
        samples,
        black,
        white,
        wb: raw.wb_coeffs,
        crops: raw.crops,
        cfa,
    }
}

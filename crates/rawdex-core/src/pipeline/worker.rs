//! A RAW worker: one decoder plus the per-image state it fills.

use std::path::{Path, PathBuf};

use crate::dop::read_dop_properties;
use crate::error::{PipelineError, PipelineResult};
use crate::raw::{ImageKind, RawDecoder};
use crate::types::{clean_text, DopProperties, ExifProperties, ImageRecord};

use super::preview::PreviewRenderer;

/// Drives one image at a time through a [`RawDecoder`].
///
/// [`prepare_file`](Self::prepare_file) runs on the coordinator,
/// [`process_image`](Self::process_image) on a blocking thread. Both are
/// called on the same worker for a given image, in that order.
pub struct RawWorker {
    decoder: Box<dyn RawDecoder>,
    renderer: PreviewRenderer,
    path: Option<PathBuf>,
    exif: ExifProperties,
    dop: DopProperties,
    preview: Vec<u8>,
}

impl RawWorker {
    pub fn new(decoder: Box<dyn RawDecoder>, renderer: PreviewRenderer) -> Self {
        Self {
            decoder,
            renderer,
            path: None,
            exif: ExifProperties::default(),
            dop: DopProperties::default(),
            preview: Vec::new(),
        }
    }

    /// Open `path`, read its sidecar and collect its metadata.
    ///
    /// Decoder failures are logged; the image then fails in
    /// [`process_image`](Self::process_image).
    pub fn prepare_file(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
        self.exif = ExifProperties::default();
        self.preview.clear();
        self.dop = read_dop_properties(path);

        if let Err(e) = self.decoder.open_file(path, &mut self.exif) {
            tracing::warn!(path = %path.display(), "Unable to open file: {e}");
        }
        if let Err(e) = self.decoder.unpack() {
            tracing::warn!(path = %path.display(), "Unable to unpack: {e}");
        }

        let props = self.decoder.properties();
        self.exif.make = clean_text(&props.make);
        self.exif.model = clean_text(&props.model);
        self.exif.artist = clean_text(&props.artist);
        self.exif.iso_speed = props.iso_speed;
        self.exif.aperture = props.aperture;
        self.exif.focal_length = props.focal_length;
        self.exif.timestamp = props.timestamp;

        self.decoder.recycle_datastream();
        tracing::debug!(path = %path.display(), "EXIF properties:\n{}", self.exif);
    }

    /// Develop the prepared image and render its preview.
    ///
    /// The decoder is recycled whether or not this succeeds.
    pub fn process_image(&mut self) -> PipelineResult<()> {
        let result = self.render_preview();
        self.decoder.recycle();
        result
    }

    fn render_preview(&mut self) -> PipelineResult<()> {
        let path = self.path.clone().unwrap_or_default();
        let decode_error = |source| PipelineError::Decode {
            path: path.clone(),
            source,
        };

        self.decoder.process().map_err(decode_error)?;
        let image = self.decoder.make_image().map_err(decode_error)?;
        if image.kind != ImageKind::Bitmap {
            return Err(PipelineError::NotBitmap { path });
        }
        self.renderer.render(&path, &image, &mut self.preview)
    }

    /// The image currently prepared on this worker.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn exif(&self) -> &ExifProperties {
        &self.exif
    }

    pub fn dop(&self) -> &DopProperties {
        &self.dop
    }

    /// JPEG preview produced by the last successful `process_image`.
    pub fn preview(&self) -> &[u8] {
        &self.preview
    }

    /// Row for the current image.
    pub fn record<'a>(&'a self, filename: &'a str, project: &'a str) -> ImageRecord<'a> {
        ImageRecord {
            filename,
            project,
            exif: &self.exif,
            dop: &self.dop,
            preview: &self.preview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreviewConfig;
    use crate::error::RawError;
    use crate::exif::ExifVisitor;
    use crate::raw::{DecodedImage, RawProperties};

    /// Decoder producing a fixed image and properties.
    struct StubDecoder {
        props: RawProperties,
        image: Option<DecodedImage>,
        fail_process: bool,
    }

    impl StubDecoder {
        fn new(colors: u16, bits: u16) -> Self {
            let len = 8 * 6 * colors as usize * bits as usize / 8;
            Self {
                props: RawProperties {
                    make: "OLYMPUS IMAGING CORP.  \0\0".into(),
                    model: "E-M5\0".into(),
                    artist: "Jane Doe \t".into(),
                    iso_speed: 200.0,
                    aperture: 2.8,
                    focal_length: 12.0,
                    timestamp: 1_371_292_200,
                },
                image: Some(DecodedImage {
                    kind: ImageKind::Bitmap,
                    width: 8,
                    height: 6,
                    colors,
                    bits,
                    data: vec![0x40; len],
                }),
                fail_process: false,
            }
        }
    }

    impl RawDecoder for StubDecoder {
        fn open_file(&mut self, _path: &Path, _visitor: &mut dyn ExifVisitor) -> Result<(), RawError> {
            Ok(())
        }
        fn unpack(&mut self) -> Result<(), RawError> {
            Ok(())
        }
        fn properties(&self) -> &RawProperties {
            &self.props
        }
        fn recycle_datastream(&mut self) {}
        fn process(&mut self) -> Result<(), RawError> {
            if self.fail_process {
                Err(RawError::Decoder("corrupt".into()))
            } else {
                Ok(())
            }
        }
        fn make_image(&mut self) -> Result<DecodedImage, RawError> {
            self.image.clone().ok_or(RawError::OutOfOrder("no image"))
        }
        fn recycle(&mut self) {}
    }

    fn worker(decoder: StubDecoder) -> RawWorker {
        RawWorker::new(Box::new(decoder), PreviewRenderer::new(PreviewConfig::default()))
    }

    #[test]
    fn test_prepare_cleans_text() {
        let mut worker = worker(StubDecoder::new(3, 16));
        worker.prepare_file(Path::new("/nonexistent/P1.ORF"));
        let exif = worker.exif();
        assert_eq!(exif.make, "OLYMPUS IMAGING CORP.");
        assert_eq!(exif.model, "E-M5");
        assert_eq!(exif.artist, "Jane Doe");
        assert_eq!(exif.iso_speed, 200.0);
        assert_eq!(exif.timestamp, 1_371_292_200);
        assert_eq!(worker.dop().rank, 0);
    }

    #[test]
    fn test_process_renders_preview() {
        let mut worker = worker(StubDecoder::new(3, 8));
        worker.prepare_file(Path::new("/nonexistent/P1.ORF"));
        worker.process_image().unwrap();
        assert_eq!(&worker.preview()[..2], &[0xFF, 0xD8]);

        let record = worker.record("/nonexistent/P1.ORF", "nonexistent");
        assert_eq!(record.project, "nonexistent");
        assert_eq!(record.preview.len(), worker.preview().len());
    }

    #[test]
    fn test_process_failure_is_not_fatal() {
        let mut decoder = StubDecoder::new(3, 8);
        decoder.fail_process = true;
        let mut worker = worker(decoder);
        worker.prepare_file(Path::new("/nonexistent/P1.ORF"));
        let err = worker.process_image().unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_non_bitmap_is_fatal() {
        let mut decoder = StubDecoder::new(3, 8);
        if let Some(image) = decoder.image.as_mut() {
            image.kind = ImageKind::Jpeg;
        }
        let mut worker = worker(decoder);
        worker.prepare_file(Path::new("/nonexistent/P1.ORF"));
        let err = worker.process_image().unwrap_err();
        assert!(matches!(err, PipelineError::NotBitmap { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_prepare_resets_previous_image() {
        let mut worker = worker(StubDecoder::new(3, 8));
        worker.prepare_file(Path::new("/nonexistent/P1.ORF"));
        worker.process_image().unwrap();
        worker.exif.copyright = "stale".into();

        worker.prepare_file(Path::new("/nonexistent/P2.ORF"));
        assert!(worker.exif().copyright.is_empty());
        assert!(worker.preview().is_empty());
        assert_eq!(worker.path(), Some(Path::new("/nonexistent/P2.ORF")));
    }
}

//! Extraction pipeline
//!
//! `ExtractionPipeline` chains segmentation, compositing and JPEG output for
//! one source image and one seed rectangle. Every run is independent: the
//! pipeline holds configuration and the segmenter, never image state.

use crate::{
    compositor,
    config::ExtractionConfig,
    error::{ExtractionError, Result},
    segmentation::{GrabCut, Segmenter},
    services::ImageIOService,
    types::{ExtractionReport, ProcessingTimings, Rectangle, SegmentationMask, SourceImage},
};
use image::RgbImage;
use instant::Instant;
use log::debug;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, span, Level};

/// Runs segment, compose and write for a source image
pub struct ExtractionPipeline {
    config: ExtractionConfig,
    segmenter: Box<dyn Segmenter>,
}

impl std::fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPipeline")
            .field("config", &self.config)
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

impl ExtractionPipeline {
    /// Create a pipeline using the built-in GrabCut segmenter
    ///
    /// # Errors
    /// `InvalidConfig` when `config` fails validation.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = Box::new(GrabCut::new(&config));
        Ok(Self { config, segmenter })
    }

    /// Create a pipeline with a custom segmenter
    ///
    /// The segmenter's own rectangle policy governs validation.
    ///
    /// # Errors
    /// `InvalidConfig` when `config` fails validation.
    pub fn with_segmenter(config: ExtractionConfig, segmenter: Box<dyn Segmenter>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, segmenter })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Name of the segmenter in use
    #[must_use]
    pub fn segmenter_name(&self) -> &'static str {
        self.segmenter.name()
    }

    /// Where a cutout of `source` will be written
    #[must_use]
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        ImageIOService::derived_output_path(source, &self.config.output_suffix)
    }

    /// Segment and composite without touching storage
    ///
    /// Returns the composited image, the mask and the rectangle that was
    /// actually used.
    ///
    /// # Errors
    /// `InvalidRectangle` when `rect` fails validation.
    pub fn render(
        &self,
        source: &SourceImage,
        rect: Rectangle,
    ) -> Result<(RgbImage, SegmentationMask, Rectangle)> {
        let mut timings = ProcessingTimings::default();
        self.render_timed(source, rect, &mut timings)
    }

    fn render_timed(
        &self,
        source: &SourceImage,
        rect: Rectangle,
        timings: &mut ProcessingTimings,
    ) -> Result<(RgbImage, SegmentationMask, Rectangle)> {
        let rect = self.segmenter.validate_rectangle(source.dimensions(), rect)?;

        let mask = {
            let _span = span!(
                Level::INFO,
                "segmentation",
                segmenter = self.segmenter.name(),
                rect = %rect
            )
            .entered();
            let start = Instant::now();
            let mask = self.segmenter.segment(source.pixels(), rect)?;
            timings.segmentation_ms = start.elapsed().as_millis() as u64;
            mask
        };

        let composed = {
            let _span = span!(Level::DEBUG, "compositing").entered();
            let start = Instant::now();
            let composed = compositor::compose(source.pixels(), &mask)?;
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            composed
        };

        Ok((composed, mask, rect))
    }

    /// Extract the foreground inside `rect` and write it next to the source
    ///
    /// The result is written to `<source path><output suffix>` as JPEG,
    /// replacing any earlier result. Returns the written path.
    ///
    /// # Errors
    /// - `InvalidRectangle` when `rect` fails validation; nothing is written
    /// - `Encode` or `PermissionDenied` when the result cannot be stored
    pub fn extract(&self, source: &SourceImage, rect: Rectangle) -> Result<PathBuf> {
        Ok(self.extract_with_report(source, rect)?.output_path)
    }

    /// Same as [`ExtractionPipeline::extract`] with mask statistics and
    /// stage timings
    ///
    /// # Errors
    /// See [`ExtractionPipeline::extract`].
    #[instrument(
        skip(self, source, rect),
        fields(
            source = %source.path().display(),
            dimensions = %format!("{}x{}", source.dimensions().0, source.dimensions().1)
        )
    )]
    pub fn extract_with_report(
        &self,
        source: &SourceImage,
        rect: Rectangle,
    ) -> Result<ExtractionReport> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        info!(rect = %rect, segmenter = self.segmenter.name(), "Starting extraction");

        let (composed, mask, rect) = self.render_timed(source, rect, &mut timings)?;

        let output_path = self.output_path_for(source.path());
        {
            let _span = span!(Level::DEBUG, "encoding", output = %output_path.display()).entered();
            let start = Instant::now();
            let bytes = ImageIOService::encode_jpeg(&composed, self.config.jpeg_quality)
                .map_err(|e| match e {
                    ExtractionError::Encode { reason, .. } => {
                        ExtractionError::encode_error(&output_path, reason)
                    },
                    other => other,
                })?;
            ImageIOService::write_atomic(&output_path, &bytes)?;
            timings.encode_ms = start.elapsed().as_millis() as u64;
        }

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        let mask_statistics = mask.statistics();

        debug!(
            "Extraction timings: segmentation {}ms, compositing {}ms, encode {}ms, other {}ms",
            timings.segmentation_ms,
            timings.compositing_ms,
            timings.encode_ms,
            timings.other_overhead_ms()
        );
        info!(
            output = %output_path.display(),
            foreground_ratio = mask_statistics.foreground_ratio,
            total_ms = timings.total_ms,
            "Extraction complete"
        );

        Ok(ExtractionReport {
            output_path,
            rectangle: rect,
            mask_statistics,
            timings,
        })
    }

    /// Load `path` and extract the foreground inside `rect`
    ///
    /// # Errors
    /// Decode failures from loading plus everything
    /// [`ExtractionPipeline::extract`] reports.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P, rect: Rectangle) -> Result<PathBuf> {
        let source = ImageIOService::load_source(path)?;
        self.extract(&source, rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RectanglePolicy;
    use image::Rgb;

    /// Marks exactly the seed rectangle as foreground
    struct RectangleSegmenter;

    impl Segmenter for RectangleSegmenter {
        fn name(&self) -> &'static str {
            "rectangle"
        }

        fn rectangle_policy(&self) -> RectanglePolicy {
            RectanglePolicy::Clamp
        }

        fn segment(&self, image: &RgbImage, rect: Rectangle) -> Result<SegmentationMask> {
            Ok(SegmentationMask::from_fn(image.width(), image.height(), |x, y| {
                rect.contains(x, y)
            }))
        }
    }

    fn source(dir: &Path) -> SourceImage {
        let pixels = RgbImage::from_fn(40, 30, |x, _| Rgb([(x * 6) as u8, 80, 120]));
        SourceImage::from_pixels(dir.join("photo.png"), pixels)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ExtractionConfig {
            iterations: 0,
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            ExtractionPipeline::new(config),
            Err(ExtractionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_render_with_custom_segmenter() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::with_segmenter(
            ExtractionConfig::default(),
            Box::new(RectangleSegmenter),
        )
        .unwrap();
        assert_eq!(pipeline.segmenter_name(), "rectangle");

        let source = source(temp_dir.path());
        let (composed, mask, used) = pipeline
            .render(&source, Rectangle::new(-5, 5, 10, 20))
            .unwrap();

        assert_eq!(used, Rectangle::new(0, 5, 10, 20));
        assert_eq!(mask.statistics().foreground_pixels, 150);
        assert_eq!(composed.get_pixel(3, 10), source.pixels().get_pixel(3, 10));
        assert_eq!(*composed.get_pixel(30, 10), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_extract_writes_suffixed_jpeg() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::builder().output_suffix("_cut.jpg").build().unwrap();
        let pipeline =
            ExtractionPipeline::with_segmenter(config, Box::new(RectangleSegmenter)).unwrap();

        let source = source(temp_dir.path());
        let report = pipeline
            .extract_with_report(&source, Rectangle::new(5, 5, 25, 25))
            .unwrap();

        assert_eq!(report.output_path, temp_dir.path().join("photo.png_cut.jpg"));
        assert!(report.output_path.exists());
        assert_eq!(report.mask_statistics.foreground_pixels, 400);
        assert!(report.timings.total_ms >= report.timings.segmentation_ms);
    }

    #[test]
    fn test_invalid_rectangle_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pipeline = ExtractionPipeline::new(ExtractionConfig::default()).unwrap();
        let source = source(temp_dir.path());

        let err = pipeline
            .extract(&source, Rectangle::new(10, 10, 10, 20))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidRectangle(_)));
        assert!(!pipeline.output_path_for(source.path()).exists());
    }
}

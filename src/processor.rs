//! Unified compositing processor
//!
//! `CompositeProcessor` owns a segmenter and runs the full request:
//! segmentation, mask refinement, canvas construction, scale resolution,
//! placement and alpha-over compositing. It is used by both the library
//! entry points and the CLI so every frontend gets identical behavior.

use crate::{
    canvas::{self, BackgroundSpec},
    compositor,
    config::{BackgroundMode, CompositeConfig},
    error::Result,
    geometry, mask, placement,
    segmentation::{segment_checked, Segmenter},
    services::ImageIOService,
    types::{AlphaMask, CompositeMetadata, CompositeResult, ProcessingTimings},
};
use image::{imageops, DynamicImage, RgbaImage};
use instant::Instant;
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug as trace_debug, info as trace_info, instrument, span, Level};

/// Compositing processor bound to one segmenter
///
/// A processor is `&mut` for the duration of a request; use one per thread
/// for concurrent work.
pub struct CompositeProcessor {
    config: CompositeConfig,
    segmenter: Box<dyn Segmenter>,
}

impl std::fmt::Debug for CompositeProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProcessor")
            .field("config", &self.config)
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

impl CompositeProcessor {
    /// Create a processor from a validated configuration
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration fails validation.
    pub fn new(config: CompositeConfig, segmenter: Box<dyn Segmenter>) -> Result<Self> {
        config.validate()?;
        debug!("Creating compositing processor with segmenter '{}'", segmenter.name());
        Ok(Self { config, segmenter })
    }

    /// Convenience constructor taking the segmenter by value
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgcomposite::{CompositeConfig, CompositeProcessor, PassthroughSegmenter};
    ///
    /// let processor = CompositeProcessor::with_segmenter(CompositeConfig::default(), PassthroughSegmenter)?;
    /// assert_eq!(processor.segmenter_name(), "passthrough");
    /// # Ok::<(), imgly_bgcomposite::CompositeError>(())
    /// ```
    pub fn with_segmenter<S: Segmenter + 'static>(config: CompositeConfig, segmenter: S) -> Result<Self> {
        Self::new(config, Box::new(segmenter))
    }

    #[must_use]
    pub fn config(&self) -> &CompositeConfig {
        &self.config
    }

    #[must_use]
    pub fn segmenter_name(&self) -> &str {
        self.segmenter.name()
    }

    /// Decode and process encoded foreground and optional background bytes
    ///
    /// # Errors
    /// `Decode` for undecodable input, plus everything [`Self::process_image`] returns.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use imgly_bgcomposite::{BackgroundMode, CompositeConfig, CompositeProcessor, PassthroughSegmenter};
    ///
    /// # fn example(portrait: Vec<u8>, beach: Vec<u8>) -> anyhow::Result<()> {
    /// let config = CompositeConfig::builder()
    ///     .background_mode(BackgroundMode::Image)
    ///     .seed(7)
    ///     .build()?;
    /// let mut processor = CompositeProcessor::with_segmenter(config, PassthroughSegmenter)?;
    /// let result = processor.process_bytes(&portrait, Some(beach.as_slice()))?;
    /// let jpeg = result.to_bytes(90)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn process_bytes(&mut self, foreground: &[u8], background: Option<&[u8]>) -> Result<CompositeResult> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        let decode_start = Instant::now();
        let (foreground, background) = {
            let _span = span!(Level::DEBUG, "decode", foreground_bytes = foreground.len()).entered();
            let fg = ImageIOService::load_from_bytes(foreground)?;
            let bg = background.map(ImageIOService::load_from_bytes).transpose()?;
            (fg, bg)
        };
        timings.image_decode_ms = decode_start.elapsed().as_millis() as u64;

        let (mut rng, seed) = self.request_rng();
        self.run(&foreground, background, &mut rng, Some(seed), timings, total_start)
    }

    /// Read an async stream to the end and process it
    ///
    /// The stream is only buffered here; all compositing work is synchronous.
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        mut reader: R,
        background: Option<&[u8]>,
    ) -> Result<CompositeResult> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        AsyncReadExt::read_to_end(&mut reader, &mut buffer)
            .await
            .map_err(|e| crate::CompositeError::processing(format!("Failed to read from stream: {}", e)))?;

        self.process_bytes(&buffer, background)
    }

    /// Process an already decoded foreground
    ///
    /// The placement rng is seeded from the configured seed, or from OS
    /// entropy when none is set. The seed actually used is reported in the
    /// result metadata either way.
    ///
    /// # Errors
    /// - `InvalidConfig` when image mode has no background
    /// - `Segmentation` from the segmenter, verbatim
    /// - `DegenerateScale` when the scaled foreground has a zero side
    /// - `Internal` when a stage breaks a size invariant
    pub fn process_image(&mut self, foreground: &DynamicImage, background: Option<DynamicImage>) -> Result<CompositeResult> {
        let (mut rng, seed) = self.request_rng();
        self.run(foreground, background, &mut rng, Some(seed), ProcessingTimings::default(), Instant::now())
    }

    /// Process with a caller-supplied rng
    ///
    /// Useful when several requests must share one reproducible stream.
    /// `metadata.seed` is `None` since the rng's origin is unknown here.
    pub fn process_image_with_rng<R: Rng>(
        &mut self,
        foreground: &DynamicImage,
        background: Option<DynamicImage>,
        rng: &mut R,
    ) -> Result<CompositeResult> {
        self.run(foreground, background, rng, None, ProcessingTimings::default(), Instant::now())
    }

    fn request_rng(&self) -> (StdRng, u64) {
        let seed = self.config.seed.unwrap_or_else(|| StdRng::from_os_rng().random());
        (StdRng::seed_from_u64(seed), seed)
    }

    #[instrument(
        skip(self, foreground, background, rng, timings, total_start),
        fields(
            mode = %self.config.background_mode,
            segmenter = %self.segmenter.name(),
            dimensions = %format!("{}x{}", foreground.width(), foreground.height())
        )
    )]
    fn run<R: Rng>(
        &mut self,
        foreground: &DynamicImage,
        background: Option<DynamicImage>,
        rng: &mut R,
        seed: Option<u64>,
        mut timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<CompositeResult> {
        let foreground_size = (foreground.width(), foreground.height());
        let spec = BackgroundSpec::from_config(&self.config, background)?;

        trace_info!(
            mode = %spec.mode(),
            placement = %self.config.placement_policy(),
            "Starting compositing request"
        );

        let segmented = {
            let _span = span!(Level::INFO, "segmentation", segmenter = %self.segmenter.name()).entered();
            let start = Instant::now();
            let segmented = segment_checked(self.segmenter.as_mut(), &foreground.to_rgba8())?;
            timings.segmentation_ms = start.elapsed().as_millis() as u64;
            segmented
        };

        let refined = {
            let _span = span!(Level::DEBUG, "refine", threshold = self.config.alpha_threshold).entered();
            let start = Instant::now();
            let refined = mask::refine(segmented, self.config.alpha_threshold)?;
            timings.refine_ms = start.elapsed().as_millis() as u64;
            refined
        };
        let refined_mask = AlphaMask::from_rgba(&refined);

        let mut metadata = CompositeMetadata::new(self.segmenter.name().to_string(), spec.mode(), foreground_size);
        metadata.seed = seed;
        metadata.alpha_threshold = self.config.alpha_threshold;

        if spec.mode() == BackgroundMode::Cutout {
            timings.total_ms = total_start.elapsed().as_millis() as u64;
            metadata.timings = timings;
            info!("Cutout finished in {}ms", metadata.timings.total_ms);
            return Ok(CompositeResult::new(DynamicImage::ImageRgba8(refined), refined_mask, metadata));
        }

        let canvas = {
            let _span = span!(Level::DEBUG, "canvas", mode = %spec.mode()).entered();
            let start = Instant::now();
            let canvas = canvas::build(&spec, foreground_size)?;
            timings.canvas_ms = start.elapsed().as_millis() as u64;
            canvas
        };
        let canvas_size = canvas.dimensions();

        let placed = {
            let _span = span!(Level::DEBUG, "resize", scale = self.config.scale_factor).entered();
            let start = Instant::now();
            let placed_size = geometry::resolve_size(foreground_size, canvas_size, self.config.scale_factor)?;
            let placed = resize_foreground(refined, placed_size);
            timings.resize_ms = start.elapsed().as_millis() as u64;
            placed
        };
        let placed_size = placed.dimensions();

        let policy = self.config.placement_policy();
        let offset = placement::plan(policy, canvas_size, placed_size, rng);
        trace_debug!(%offset, %policy, "Foreground placed");

        let composited = {
            let _span = span!(Level::DEBUG, "composite", x = offset.x, y = offset.y).entered();
            let start = Instant::now();
            let composited = compositor::composite(canvas, &placed, offset)?;
            timings.composite_ms = start.elapsed().as_millis() as u64;
            composited
        };

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        metadata.placement = policy.to_string();
        metadata.placed_size = Some(placed_size);
        metadata.canvas_size = Some(canvas_size);
        metadata.offset = Some(offset);
        metadata.timings = timings;

        info!(
            "Composited {}x{} foreground onto {}x{} canvas at {} in {}ms",
            placed_size.0, placed_size.1, canvas_size.0, canvas_size.1, offset, metadata.timings.total_ms
        );

        Ok(CompositeResult::new(DynamicImage::ImageRgb8(composited), refined_mask, metadata))
    }
}

/// Lanczos resample, skipped when the size is unchanged
fn resize_foreground(image: RgbaImage, size: geometry::Size) -> RgbaImage {
    if image.dimensions() == size {
        return image;
    }
    imageops::resize(&image, size.0, size.1, imageops::FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::{test_helpers, MockSegmenter};
    use crate::config::{BackgroundColor, OutputFormat, PlacementMode};
    use crate::error::CompositeError;
    use crate::types::Offset;
    use image::{Rgb, RgbImage};

    fn color_config() -> CompositeConfig {
        CompositeConfig::builder()
            .background_mode(BackgroundMode::Color)
            .solid_color(BackgroundColor::new(0, 0, 255))
            .scale_factor(1.0)
            .seed(3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = CompositeConfig {
            scale_factor: -1.0,
            ..CompositeConfig::default()
        };
        let err = CompositeProcessor::with_segmenter(config, MockSegmenter::new()).unwrap_err();
        assert!(matches!(err, CompositeError::InvalidConfig(_)));
    }

    #[test]
    fn test_cutout_keeps_size_and_alpha() {
        let config = CompositeConfig::builder().seed(1).build().unwrap();
        let segmenter = MockSegmenter::new();
        let mut processor = CompositeProcessor::with_segmenter(config, segmenter.clone()).unwrap();

        let foreground = test_helpers::create_test_image(16, 12);
        let result = processor.process_image(&foreground, None).unwrap();

        assert_eq!(result.dimensions(), (16, 12));
        assert_eq!(result.output_format(), OutputFormat::Png);
        assert!(result.image.color().has_alpha());
        assert_eq!(result.image.to_rgba8().get_pixel(0, 0).0[3], 0);
        assert_eq!(result.mask.dimensions, (16, 12));
        assert!(result.metadata.canvas_size.is_none());
        assert_eq!(segmenter.get_call_history(), vec!["segment(16x12)"]);
    }

    #[test]
    fn test_cutout_threshold_applies() {
        let config = CompositeConfig::builder().alpha_threshold(50).build().unwrap();
        let mut processor = CompositeProcessor::with_segmenter(config, MockSegmenter::new()).unwrap();
        let result = processor
            .process_image(&test_helpers::create_test_image(20, 20), None)
            .unwrap();

        // cutoff 128: nothing faint survives
        assert!(result.mask.data.iter().all(|&a| a == 0 || a >= 128));
        assert_eq!(result.metadata.alpha_threshold, 50);
    }

    #[test]
    fn test_color_mode_centers_on_default_canvas() {
        let mut processor = CompositeProcessor::with_segmenter(color_config(), MockSegmenter::new_passthrough()).unwrap();

        let foreground = DynamicImage::ImageRgba8(test_helpers::create_solid_foreground(10, 6, [255, 0, 0, 255]));
        let result = processor.process_image(&foreground, None).unwrap();

        assert_eq!(result.dimensions(), (20, 12));
        assert_eq!(result.output_format(), OutputFormat::Jpeg);
        assert!(!result.image.color().has_alpha());
        assert_eq!(result.metadata.offset, Some(Offset::new(5, 3)));
        assert_eq!(result.metadata.placed_size, Some((10, 6)));

        let rgb = result.image.to_rgb8();
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*rgb.get_pixel(5, 3), Rgb([255, 0, 0]));
        assert_eq!(*rgb.get_pixel(14, 8), Rgb([255, 0, 0]));
        assert_eq!(*rgb.get_pixel(15, 9), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_image_mode_requires_background() {
        let config = CompositeConfig::builder()
            .background_mode(BackgroundMode::Image)
            .build()
            .unwrap();
        let segmenter = MockSegmenter::new();
        let mut processor = CompositeProcessor::with_segmenter(config, segmenter.clone()).unwrap();

        let err = processor
            .process_image(&test_helpers::create_test_image(4, 4), None)
            .unwrap_err();
        assert!(matches!(err, CompositeError::InvalidConfig(_)));
        // rejected before any segmentation work
        assert!(segmenter.get_call_history().is_empty());
    }

    #[test]
    fn test_image_mode_scales_onto_background() {
        let config = CompositeConfig::builder()
            .background_mode(BackgroundMode::Image)
            .scale_factor(0.5)
            .placement_mode(PlacementMode::Corners)
            .seed(11)
            .build()
            .unwrap();
        let mut processor = CompositeProcessor::with_segmenter(config, MockSegmenter::new_passthrough()).unwrap();

        let foreground = DynamicImage::ImageRgba8(test_helpers::create_solid_foreground(40, 20, [0, 255, 0, 255]));
        let background = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 80, Rgb([9, 9, 9])));
        let result = processor.process_image(&foreground, Some(background)).unwrap();

        assert_eq!(result.dimensions(), (100, 80));
        assert_eq!(result.metadata.placed_size, Some((20, 10)));
        assert_eq!(result.metadata.seed, Some(11));

        let offset = result.metadata.offset.unwrap();
        // 5% of the shorter side is a 4px margin
        assert!([4, 76].contains(&offset.x), "{offset}");
        assert!([4, 66].contains(&offset.y), "{offset}");
    }

    #[test]
    fn test_seeded_requests_are_reproducible() {
        let config = CompositeConfig::builder()
            .background_mode(BackgroundMode::Color)
            .canvas_size(300, 200)
            .placement_mode(PlacementMode::Random)
            .scale_factor(0.3)
            .seed(99)
            .build()
            .unwrap();
        let foreground = test_helpers::create_test_image(100, 100);

        let mut first = CompositeProcessor::with_segmenter(config.clone(), MockSegmenter::new()).unwrap();
        let mut second = CompositeProcessor::with_segmenter(config, MockSegmenter::new()).unwrap();
        let a = first.process_image(&foreground, None).unwrap();
        let b = second.process_image(&foreground, None).unwrap();

        assert_eq!(a.metadata.offset, b.metadata.offset);
        assert_eq!(a.image, b.image);
    }

    #[test]
    fn test_unseeded_request_reports_its_seed() {
        let config = CompositeConfig::builder()
            .background_mode(BackgroundMode::Color)
            .placement_mode(PlacementMode::Random)
            .build()
            .unwrap();
        let foreground = test_helpers::create_test_image(30, 30);

        let mut processor = CompositeProcessor::with_segmenter(config.clone(), MockSegmenter::new()).unwrap();
        let first = processor.process_image(&foreground, None).unwrap();
        let seed = first.metadata.seed.unwrap();

        let replay_config = CompositeConfig { seed: Some(seed), ..config };
        let mut replay = CompositeProcessor::with_segmenter(replay_config, MockSegmenter::new()).unwrap();
        let second = replay.process_image(&foreground, None).unwrap();
        assert_eq!(first.metadata.offset, second.metadata.offset);
    }

    #[test]
    fn test_degenerate_scale_is_reported() {
        let config = CompositeConfig::builder()
            .background_mode(BackgroundMode::Color)
            .canvas_size(100, 100)
            .scale_factor(0.01)
            .build()
            .unwrap();
        let mut processor = CompositeProcessor::with_segmenter(config, MockSegmenter::new()).unwrap();
        let err = processor
            .process_image(&test_helpers::create_test_image(10, 10), None)
            .unwrap_err();
        assert!(matches!(err, CompositeError::DegenerateScale { .. }));
    }

    #[test]
    fn test_segmenter_errors_propagate() {
        let mut processor = CompositeProcessor::with_segmenter(color_config(), MockSegmenter::new_failing()).unwrap();
        let err = processor
            .process_image(&test_helpers::create_test_image(4, 4), None)
            .unwrap_err();
        assert!(matches!(err, CompositeError::Segmentation(_)));

        let mut processor = CompositeProcessor::with_segmenter(color_config(), MockSegmenter::new_wrong_size()).unwrap();
        let err = processor
            .process_image(&test_helpers::create_test_image(4, 4), None)
            .unwrap_err();
        assert!(matches!(err, CompositeError::Internal(_)));
    }

    #[test]
    fn test_process_bytes_decodes_and_times() {
        let mut processor = CompositeProcessor::with_segmenter(color_config(), MockSegmenter::new()).unwrap();
        let png = test_helpers::encode_png(&test_helpers::create_solid_foreground(8, 8, [1, 2, 3, 255]));

        let result = processor.process_bytes(&png, None).unwrap();
        assert_eq!(result.dimensions(), (16, 16));
        assert!(result.timings().total_ms >= result.timings().segmentation_ms);

        let err = processor.process_bytes(b"not an image", None).unwrap_err();
        assert!(matches!(err, CompositeError::Decode(_)));
    }

    #[test]
    fn test_process_with_external_rng() {
        let config = CompositeConfig::builder()
            .background_mode(BackgroundMode::Color)
            .canvas_size(200, 200)
            .placement_mode(PlacementMode::Thirds)
            .scale_factor(0.2)
            .build()
            .unwrap();
        let mut processor = CompositeProcessor::with_segmenter(config, MockSegmenter::new()).unwrap();
        let foreground = test_helpers::create_test_image(100, 100);

        let mut rng_a = StdRng::seed_from_u64(5);
        let mut rng_b = StdRng::seed_from_u64(5);
        let a = processor.process_image_with_rng(&foreground, None, &mut rng_a).unwrap();
        let b = processor.process_image_with_rng(&foreground, None, &mut rng_b).unwrap();

        assert_eq!(a.metadata.offset, b.metadata.offset);
        assert_eq!(a.metadata.seed, None);
        assert_eq!(a.metadata.placement, "thirds(jitter=0.02)");
    }

    #[tokio::test]
    async fn test_process_reader() {
        let mut processor = CompositeProcessor::with_segmenter(CompositeConfig::default(), MockSegmenter::new()).unwrap();
        let png = test_helpers::encode_png(&test_helpers::create_solid_foreground(5, 7, [1, 2, 3, 255]));
        let result = processor.process_reader(std::io::Cursor::new(png), None).await.unwrap();
        assert_eq!(result.dimensions(), (5, 7));
    }
}

//! Core types shared by the compositing stages

use crate::{
    config::{BackgroundMode, OutputFormat},
    error::{CompositeError, Result},
    mask,
    services::{ImageIOService, OutputFormatHandler},
};
use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-left position of the foreground on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

impl Offset {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Offset {
    fn from((x, y): (u32, u32)) -> Self {
        Self::new(x, y)
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Single-channel opacity buffer, same size as the image it was taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaMask {
    /// Row-major alpha values (0-255)
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl AlphaMask {
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Copy the alpha channel out of an RGBA image
    #[must_use]
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let data = image.pixels().map(|p| p.0[3]).collect();
        Self::new(data, image.dimensions())
    }

    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self::new(image.as_raw().clone(), image.dimensions())
    }

    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone()).ok_or_else(|| {
            CompositeError::internal(format!(
                "Mask buffer of {} bytes does not match {}x{}",
                self.data.len(),
                width,
                height
            ))
        })
    }

    /// Write this mask into the alpha channel of an RGBA image
    ///
    /// A size mismatch is a broken invariant, never silently clamped.
    pub fn apply_to_image(&self, image: &mut RgbaImage) -> Result<()> {
        if image.dimensions() != self.dimensions || self.data.len() != image.pixels().len() {
            return Err(CompositeError::internal(format!(
                "Image {:?} and mask {:?} dimensions do not match",
                image.dimensions(),
                self.dimensions
            )));
        }

        for (pixel, &alpha) in image.pixels_mut().zip(&self.data) {
            pixel.0[3] = alpha;
        }

        Ok(())
    }

    /// New mask with values below the percent cutoff zeroed
    pub fn threshold(&self, percent: u8) -> Result<AlphaMask> {
        let cutoff = mask::cutoff_for(percent)?;
        let data = self
            .data
            .iter()
            .map(|&a| if a < cutoff { 0 } else { a })
            .collect();
        Ok(Self::new(data, self.dimensions))
    }

    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let opaque_pixels = self.data.iter().filter(|&&a| a == 255).count();
        let transparent_pixels = self.data.iter().filter(|&&a| a == 0).count();
        let partial_pixels = total_pixels - opaque_pixels - transparent_pixels;
        let coverage = if total_pixels == 0 {
            0.0
        } else {
            self.data.iter().map(|&a| f64::from(a)).sum::<f64>() / (255.0 * total_pixels as f64)
        };

        MaskStatistics {
            total_pixels,
            opaque_pixels,
            transparent_pixels,
            partial_pixels,
            coverage: coverage as f32,
        }
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.to_image()?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Statistics about an alpha mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub opaque_pixels: usize,
    pub transparent_pixels: usize,
    /// Pixels with alpha strictly between 0 and 255 (soft edges)
    pub partial_pixels: usize,
    /// Mean opacity, 0.0-1.0
    pub coverage: f32,
}

/// Per-stage timing breakdown for a compositing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    pub image_decode_ms: u64,
    pub segmentation_ms: u64,
    pub refine_ms: u64,
    pub canvas_ms: u64,
    pub resize_ms: u64,
    pub composite_ms: u64,
    pub image_encode_ms: Option<u64>,
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time not attributed to any measured stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.image_decode_ms
            + self.segmentation_ms
            + self.refine_ms
            + self.canvas_ms
            + self.resize_ms
            + self.composite_ms
            + self.image_encode_ms.unwrap_or(0);
        self.total_ms.saturating_sub(measured)
    }
}

/// Metadata about a compositing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeMetadata {
    pub timings: ProcessingTimings,

    /// Name reported by the segmenter that produced the mask
    pub segmenter: String,

    pub background_mode: BackgroundMode,

    /// Placement policy in display form, e.g. `thirds(jitter=0.02)`
    pub placement: String,

    pub seed: Option<u64>,

    pub alpha_threshold: u8,

    /// Foreground size as received
    pub foreground_size: (u32, u32),

    /// Foreground size after scale resolution (composites only)
    pub placed_size: Option<(u32, u32)>,

    pub canvas_size: Option<(u32, u32)>,

    pub offset: Option<Offset>,

    pub output_format: OutputFormat,
}

impl CompositeMetadata {
    #[must_use]
    pub fn new(segmenter: String, background_mode: BackgroundMode, foreground_size: (u32, u32)) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            segmenter,
            background_mode,
            placement: String::from("none"),
            seed: None,
            alpha_threshold: 0,
            foreground_size,
            placed_size: None,
            canvas_size: None,
            offset: None,
            output_format: OutputFormat::for_mode(background_mode),
        }
    }
}

/// Result of a compositing request
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// RGBA for cutouts, RGB for composites
    pub image: DynamicImage,

    /// Refined foreground alpha at the original foreground size
    pub mask: AlphaMask,

    pub metadata: CompositeMetadata,
}

impl CompositeResult {
    #[must_use]
    pub fn new(image: DynamicImage, mask: AlphaMask, metadata: CompositeMetadata) -> Self {
        Self { image, mask, metadata }
    }

    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        self.metadata.output_format
    }

    /// Encode in the format chosen for this request's background mode
    pub fn to_bytes(&self, jpeg_quality: u8) -> Result<Vec<u8>> {
        OutputFormatHandler::encode(&self.image, self.output_format(), jpeg_quality)
    }

    /// Encode and write to `path`, recording the encode time
    pub fn save<P: AsRef<Path>>(&mut self, path: P, jpeg_quality: u8) -> Result<()> {
        let encode_start = instant::Instant::now();
        ImageIOService::save_image(&self.image, path, self.output_format(), jpeg_quality)?;
        self.metadata.timings.image_encode_ms = Some(encode_start.elapsed().as_millis() as u64);
        Ok(())
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let mut summary = format!(
            "Total: {}ms | Decode: {}ms | Segment: {}ms | Refine: {}ms | Canvas: {}ms | Resize: {}ms | Composite: {}ms",
            t.total_ms,
            t.image_decode_ms,
            t.segmentation_ms,
            t.refine_ms,
            t.canvas_ms,
            t.resize_ms,
            t.composite_ms
        );

        if let Some(encode_ms) = t.image_encode_ms {
            summary.push_str(&format!(" | Encode: {}ms", encode_ms));
        }

        let other_ms = t.other_overhead_ms();
        if other_ms > 5 {
            summary.push_str(&format!(" | Other: {}ms", other_ms));
        }

        summary
    }
}

//! Test utilities and mock segmenters
//!
//! Mock implementations of the `Segmenter` trait let the pipeline be tested
//! without a real segmentation model.

use crate::{
    error::{CompositeError, Result},
    segmentation::Segmenter,
};
use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};

/// What the mock does with its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockBehavior {
    /// Keep a centered disc with soft edges, clear everything else
    Disc,
    /// Return the input unchanged
    Passthrough,
    /// Fail with a segmentation error
    Fail,
    /// Return an image one pixel wider than the input
    WrongSize,
}

/// Mock segmenter for testing
#[derive(Debug, Clone)]
pub struct MockSegmenter {
    behavior: MockBehavior,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockSegmenter {
    /// Mock that keeps a soft-edged disc in the middle of the image
    #[must_use]
    pub fn new() -> Self {
        Self {
            behavior: MockBehavior::Disc,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn new_passthrough() -> Self {
        Self {
            behavior: MockBehavior::Passthrough,
            ..Self::new()
        }
    }

    /// Create a mock segmenter that fails every call
    #[must_use]
    pub fn new_failing() -> Self {
        Self {
            behavior: MockBehavior::Fail,
            ..Self::new()
        }
    }

    /// Create a mock segmenter that breaks the size contract
    #[must_use]
    pub fn new_wrong_size() -> Self {
        Self {
            behavior: MockBehavior::WrongSize,
            ..Self::new()
        }
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Clear the call history
    pub fn clear_call_history(&self) {
        self.call_history.lock().unwrap().clear();
    }

    fn record_call(&self, image: &RgbaImage) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(format!("segment({}x{})", image.width(), image.height()));
        }
    }
}

impl Default for MockSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for MockSegmenter {
    fn segment(&mut self, image: &RgbaImage) -> Result<RgbaImage> {
        self.record_call(image);

        match self.behavior {
            MockBehavior::Disc => Ok(test_helpers::apply_disc_alpha(image)),
            MockBehavior::Passthrough => Ok(image.clone()),
            MockBehavior::Fail => Err(CompositeError::segmentation("mock segmentation failure")),
            MockBehavior::WrongSize => Ok(RgbaImage::new(image.width() + 1, image.height())),
        }
    }

    fn name(&self) -> &str {
        "mock-segmenter"
    }
}

/// Helper functions for creating test images
pub mod test_helpers {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    /// Opaque gradient photo of the given size
    pub fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let r = ((x as f32 / width.max(1) as f32) * 255.0) as u8;
            let g = ((y as f32 / height.max(1) as f32) * 255.0) as u8;
            Rgb([r, g, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Solid RGBA foreground
    pub fn create_solid_foreground(width: u32, height: u32, pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(pixel))
    }

    /// Copy of `image` whose alpha is a centered disc fading toward its rim
    pub fn apply_disc_alpha(image: &RgbaImage) -> RgbaImage {
        let (width, height) = image.dimensions();
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 2.0).max(1.0);

        let mut out = image.clone();
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - center_x;
            let dy = y as f32 + 0.5 - center_y;
            let distance = (dx * dx + dy * dy).sqrt();
            let alpha = ((radius - distance) / radius).clamp(0.0, 1.0);
            pixel.0[3] = (alpha * 255.0).round() as u8;
        }
        out
    }

    /// Encode an RGBA image as PNG bytes
    pub fn encode_png(image: &RgbaImage) -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mut segmenter = MockSegmenter::new();
        let image = RgbaImage::new(8, 6);
        segmenter.segment(&image).unwrap();
        segmenter.segment(&image).unwrap();

        assert_eq!(segmenter.get_call_history(), vec!["segment(8x6)", "segment(8x6)"]);
        segmenter.clear_call_history();
        assert!(segmenter.get_call_history().is_empty());
    }

    #[test]
    fn test_mock_history_shared_between_clones() {
        let segmenter = MockSegmenter::new_passthrough();
        let mut clone = segmenter.clone();
        clone.segment(&RgbaImage::new(1, 1)).unwrap();
        assert_eq!(segmenter.get_call_history().len(), 1);
    }

    #[test]
    fn test_disc_mask_shape() {
        let image = test_helpers::create_solid_foreground(20, 20, [9, 9, 9, 255]);
        let masked = MockSegmenter::new().segment(&image).unwrap();

        assert_eq!(masked.get_pixel(0, 0).0[3], 0);
        assert!(masked.get_pixel(10, 10).0[3] > 200);
        // soft edge somewhere between
        assert!(masked.pixels().any(|p| p.0[3] > 0 && p.0[3] < 255));
        assert_eq!(masked.get_pixel(10, 10).0[..3], [9, 9, 9]);
    }

    #[test]
    fn test_failing_and_wrong_size() {
        let image = RgbaImage::new(3, 3);
        assert!(matches!(
            MockSegmenter::new_failing().segment(&image),
            Err(CompositeError::Segmentation(_))
        ));
        let wrong = MockSegmenter::new_wrong_size().segment(&image).unwrap();
        assert_eq!(wrong.dimensions(), (4, 3));
    }
}

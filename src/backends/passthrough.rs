//! Segmenter that trusts the alpha channel already present in the input

use crate::{error::Result, segmentation::Segmenter};
use image::RgbaImage;

/// Uses the input's own alpha as the foreground mask
///
/// Suitable for pre-cut PNGs produced by an external background remover.
/// Inputs without an alpha channel decode as fully opaque and are treated
/// as all foreground.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughSegmenter;

impl PassthroughSegmenter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for PassthroughSegmenter {
    fn segment(&mut self, image: &RgbaImage) -> Result<RgbaImage> {
        Ok(image.clone())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_passthrough_keeps_pixels() {
        let image = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 7, (x * 50) as u8]));
        let segmented = PassthroughSegmenter::new().segment(&image).unwrap();
        assert_eq!(segmented, image);
    }

    #[test]
    fn test_passthrough_name() {
        assert_eq!(PassthroughSegmenter.name(), "passthrough");
    }
}

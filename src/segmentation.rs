//! Segmentation collaborator abstraction
//!
//! The compositor never needs to know how a foreground mask was produced,
//! only that it receives an RGBA image of the original size whose alpha
//! channel marks the subject.

use crate::error::{CompositeError, Result};
use image::RgbaImage;
use tracing::{debug, instrument};

/// Source of foreground masks
///
/// Implementations are assumed deterministic for identical input and may
/// be slow. Errors are propagated to the caller as-is and never retried.
pub trait Segmenter {
    /// Produce the input image with its background made transparent
    ///
    /// # Errors
    /// Any failure of the underlying model; prefer `CompositeError::Segmentation`.
    fn segment(&mut self, image: &RgbaImage) -> Result<RgbaImage>;

    /// Name used in logs and result metadata
    fn name(&self) -> &str;
}

/// Segmenter backed by a closure, see [`segmenter_fn`]
pub struct FnSegmenter<F> {
    name: String,
    segment: F,
}

impl<F> std::fmt::Debug for FnSegmenter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSegmenter").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> Segmenter for FnSegmenter<F>
where
    F: FnMut(&RgbaImage) -> Result<RgbaImage>,
{
    fn segment(&mut self, image: &RgbaImage) -> Result<RgbaImage> {
        (self.segment)(image)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a [`Segmenter`]
///
/// # Examples
/// ```rust
/// use imgly_bgcomposite::segmentation::{segmenter_fn, Segmenter};
///
/// let mut keep_everything = segmenter_fn("identity", |image| Ok(image.clone()));
/// assert_eq!(keep_everything.name(), "identity");
/// ```
pub fn segmenter_fn<F>(name: impl Into<String>, segment: F) -> FnSegmenter<F>
where
    F: FnMut(&RgbaImage) -> Result<RgbaImage>,
{
    FnSegmenter {
        name: name.into(),
        segment,
    }
}

/// Run a segmenter and verify it kept the image size
///
/// A resized result would silently misalign the mask, so it is rejected as
/// an internal error instead of being resampled.
#[instrument(skip_all, fields(segmenter = segmenter.name(), width = image.width(), height = image.height()))]
pub fn segment_checked(segmenter: &mut dyn Segmenter, image: &RgbaImage) -> Result<RgbaImage> {
    let segmented = segmenter.segment(image)?;

    if segmented.dimensions() != image.dimensions() {
        return Err(CompositeError::internal(format!(
            "Segmenter '{}' returned {}x{} for a {}x{} input",
            segmenter.name(),
            segmented.width(),
            segmented.height(),
            image.width(),
            image.height()
        )));
    }

    debug!("Segmentation completed");
    Ok(segmented)
}

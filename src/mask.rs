//! Alpha-threshold refinement of segmented foregrounds
//!
//! Faint edge pixels left behind by segmentation show up as halos once the
//! foreground is pasted on a new background. Refinement zeroes every alpha
//! value below a percent cutoff and leaves the rest untouched; it never
//! boosts surviving pixels to full opacity.

use crate::error::{CompositeError, Result};
use image::RgbaImage;
use ndarray::{s, ArrayViewMut3};
use tracing::{debug, instrument};

/// Alpha cutoff for a threshold percent, `round(255 * percent / 100)`
///
/// Halves round up, so 10% maps to 26.
pub fn cutoff_for(threshold_percent: u8) -> Result<u8> {
    if threshold_percent > 100 {
        return Err(CompositeError::config_value_error(
            "alpha threshold",
            threshold_percent,
            "0-100",
            Some(0),
        ));
    }
    Ok(((255 * u32::from(threshold_percent) + 50) / 100) as u8)
}

/// Apply the alpha threshold to an RGBA image
///
/// A threshold of 0 hands the image back untouched without copying.
///
/// # Examples
/// ```rust
/// use image::{Rgba, RgbaImage};
/// use imgly_bgcomposite::mask::refine;
///
/// let mut image = RgbaImage::new(2, 1);
/// image.put_pixel(0, 0, Rgba([255, 0, 0, 20]));
/// image.put_pixel(1, 0, Rgba([255, 0, 0, 200]));
///
/// let refined = refine(image, 10).unwrap();
/// assert_eq!(refined.get_pixel(0, 0).0[3], 0);
/// assert_eq!(refined.get_pixel(1, 0).0[3], 200);
/// ```
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn refine(mut image: RgbaImage, threshold_percent: u8) -> Result<RgbaImage> {
    let cutoff = cutoff_for(threshold_percent)?;
    if cutoff == 0 {
        return Ok(image);
    }

    apply_cutoff(&mut image, cutoff)?;
    debug!(cutoff, "Alpha threshold applied");
    Ok(image)
}

/// Zero every alpha value strictly below `cutoff`, in place
pub fn apply_cutoff(image: &mut RgbaImage, cutoff: u8) -> Result<()> {
    let (width, height) = image.dimensions();
    let shape = (height as usize, width as usize, 4);
    let mut pixels = ArrayViewMut3::from_shape(shape, &mut **image)
        .map_err(|e| CompositeError::internal(format!("RGBA buffer has unexpected layout: {}", e)))?;

    pixels
        .slice_mut(s![.., .., 3])
        .mapv_inplace(|alpha| if alpha < cutoff { 0 } else { alpha });

    Ok(())
}

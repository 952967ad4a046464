//! Scale resolution for the pasted foreground

use crate::error::{CompositeError, Result};
use tracing::debug;

/// Width and height in pixels
pub type Size = (u32, u32);

/// Target foreground size for a requested scale factor
///
/// The naive size is `floor(fg * scale)` per axis. If it would exceed the
/// canvas on either axis, the original foreground is instead fit inside the
/// canvas with its aspect ratio preserved, each side floored and at least 1.
/// The fit is computed in integer arithmetic, so an axis that fills the
/// canvas lands exactly on the canvas edge.
///
/// # Errors
/// - `InvalidConfig` for a non-finite or non-positive scale
/// - `DegenerateScale` when the naive size has a zero side
/// - `Processing` for an empty foreground or canvas
///
/// # Examples
/// ```rust
/// use imgly_bgcomposite::geometry::resolve_size;
///
/// assert_eq!(resolve_size((400, 200), (1000, 1000), 0.5).unwrap(), (200, 100));
/// // too large for the canvas, fit instead
/// assert_eq!(resolve_size((400, 200), (100, 100), 1.0).unwrap(), (100, 50));
/// ```
pub fn resolve_size(foreground: Size, canvas: Size, scale: f64) -> Result<Size> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CompositeError::config_value_error(
            "scale factor",
            scale,
            "> 0.0",
            Some(0.5),
        ));
    }

    let (fg_width, fg_height) = foreground;
    let (canvas_width, canvas_height) = canvas;

    if fg_width == 0 || fg_height == 0 {
        return Err(CompositeError::processing_stage_error(
            "scale",
            "foreground has zero area",
            Some(&format!("{}x{}", fg_width, fg_height)),
        ));
    }
    if canvas_width == 0 || canvas_height == 0 {
        return Err(CompositeError::processing_stage_error(
            "scale",
            "canvas has zero area",
            Some(&format!("{}x{}", canvas_width, canvas_height)),
        ));
    }

    let naive = (scale_dimension(fg_width, scale), scale_dimension(fg_height, scale));
    if naive.0 == 0 || naive.1 == 0 {
        return Err(CompositeError::degenerate_scale(scale, foreground, naive));
    }

    if naive.0 <= canvas_width && naive.1 <= canvas_height {
        return Ok(naive);
    }

    let fitted = fit_within(foreground, canvas);
    debug!(
        requested_width = naive.0,
        requested_height = naive.1,
        fitted_width = fitted.0,
        fitted_height = fitted.1,
        "Scaled foreground exceeds canvas, fitting instead"
    );
    Ok(fitted)
}

/// `floor(dimension * scale)`, saturating at `u32::MAX`
fn scale_dimension(dimension: u32, scale: f64) -> u32 {
    let scaled = (f64::from(dimension) * scale).floor();
    if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Largest aspect-preserving size inside `canvas`, scaled from the original foreground
///
/// `min(cw / fw, ch / fh)` is decided by cross-multiplying so no ratio is rounded.
fn fit_within(foreground: Size, canvas: Size) -> Size {
    let (fw, fh) = (u64::from(foreground.0), u64::from(foreground.1));
    let (cw, ch) = (u64::from(canvas.0), u64::from(canvas.1));

    let (width, height) = if cw * fh <= ch * fw {
        // width is the binding side
        (cw, fh * cw / fw)
    } else {
        (fw * ch / fh, ch)
    };

    (clamp_dimension(width), clamp_dimension(height))
}

fn clamp_dimension(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX).max(1)
}

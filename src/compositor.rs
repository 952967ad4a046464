//! Straight alpha-over compositing
//!
//! `out = fg * a / 255 + bg * (1 - a / 255)`, rounded to the nearest integer
//! per channel. Alpha 255 replaces the canvas pixel; alpha 0 leaves it alone.
//! The foreground's own alpha channel is the paste mask.

use crate::error::{CompositeError, Result};
use crate::types::Offset;
use image::{RgbImage, RgbaImage};
use ndarray::{s, ArrayView3, ArrayViewMut3, Axis, Zip};
use tracing::{instrument, trace};

/// Paste `foreground` onto `canvas` at `offset` and return the canvas
///
/// # Errors
/// `Internal` if the foreground region `[x, x + fw) x [y, y + fh)` does not
/// lie inside the canvas. Placement always produces in-bounds offsets, so
/// this signals a broken invariant rather than bad input.
///
/// # Examples
/// ```rust
/// use image::{Rgb, RgbImage, Rgba, RgbaImage};
/// use imgly_bgcomposite::{compositor::composite, Offset};
///
/// let canvas = RgbImage::from_pixel(4, 4, Rgb([0, 0, 255]));
/// let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
///
/// let out = composite(canvas, &red, Offset::new(0, 0)).unwrap();
/// assert_eq!(*out.get_pixel(1, 1), Rgb([255, 0, 0]));
/// assert_eq!(*out.get_pixel(2, 2), Rgb([0, 0, 255]));
/// ```
pub fn composite(mut canvas: RgbImage, foreground: &RgbaImage, offset: Offset) -> Result<RgbImage> {
    composite_onto(&mut canvas, foreground, offset)?;
    Ok(canvas)
}

/// In-place variant of [`composite`]
#[instrument(skip_all, fields(x = offset.x, y = offset.y, fg_width = foreground.width(), fg_height = foreground.height()))]
pub fn composite_onto(canvas: &mut RgbImage, foreground: &RgbaImage, offset: Offset) -> Result<()> {
    let (canvas_width, canvas_height) = canvas.dimensions();
    let (fg_width, fg_height) = foreground.dimensions();

    let right = u64::from(offset.x) + u64::from(fg_width);
    let bottom = u64::from(offset.y) + u64::from(fg_height);
    if right > u64::from(canvas_width) || bottom > u64::from(canvas_height) {
        return Err(CompositeError::internal(format!(
            "Paste region {}x{} at {} exceeds {}x{} canvas",
            fg_width, fg_height, offset, canvas_width, canvas_height
        )));
    }

    let source = ArrayView3::from_shape((fg_height as usize, fg_width as usize, 4), &**foreground)
        .map_err(|e| CompositeError::internal(format!("RGBA buffer has unexpected layout: {}", e)))?;
    let mut target = ArrayViewMut3::from_shape(
        (canvas_height as usize, canvas_width as usize, 3),
        &mut **canvas,
    )
    .map_err(|e| CompositeError::internal(format!("RGB buffer has unexpected layout: {}", e)))?;

    let (x, y) = (offset.x as usize, offset.y as usize);
    let mut region = target.slice_mut(s![y..y + fg_height as usize, x..x + fg_width as usize, ..]);

    Zip::from(region.lanes_mut(Axis(2)))
        .and(source.lanes(Axis(2)))
        .for_each(|mut dst, src| {
            let alpha = u32::from(src[3]);
            match alpha {
                0 => {},
                255 => {
                    dst[0] = src[0];
                    dst[1] = src[1];
                    dst[2] = src[2];
                },
                _ => {
                    for channel in 0..3 {
                        dst[channel] = blend(src[channel], dst[channel], alpha);
                    }
                },
            }
        });

    trace!("Foreground composited");
    Ok(())
}

/// `round(fg * a / 255 + bg * (255 - a) / 255)` in integer arithmetic
#[inline]
fn blend(fg: u8, bg: u8, alpha: u32) -> u8 {
    let weighted = u32::from(fg) * alpha + u32::from(bg) * (255 - alpha);
    ((weighted + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    #[test]
    fn test_opaque_foreground_replaces() {
        let canvas = RgbImage::from_pixel(4, 4, BLUE);
        let foreground = RgbaImage::from_pixel(2, 2, RED);
        let out = composite(canvas, &foreground, Offset::new(0, 0)).unwrap();

        for (x, y, pixel) in out.enumerate_pixels() {
            if x < 2 && y < 2 {
                assert_eq!(*pixel, Rgb([255, 0, 0]), "({x}, {y})");
            } else {
                assert_eq!(*pixel, BLUE, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_transparent_foreground_is_noop() {
        let canvas = RgbImage::from_fn(4, 4, |x, y| Rgb([x as u8, y as u8, 99]));
        let expected = canvas.clone();
        let foreground = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 0]));
        let out = composite(canvas, &foreground, Offset::new(1, 1)).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_partial_alpha_blends_and_rounds() {
        let canvas = RgbImage::from_pixel(1, 1, Rgb([0, 0, 255]));
        let foreground = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
        let out = composite(canvas, &foreground, Offset::new(0, 0)).unwrap();
        // 255 * 128 / 255 = 128, 255 * 127 / 255 = 127
        assert_eq!(*out.get_pixel(0, 0), Rgb([128, 0, 127]));

        assert_eq!(blend(100, 200, 51), 180);
        assert_eq!(blend(0, 255, 1), 254);
        assert_eq!(blend(255, 0, 1), 1);
    }

    #[test]
    fn test_region_at_offset_only() {
        let canvas = RgbImage::from_pixel(5, 3, BLUE);
        let foreground = RgbaImage::from_pixel(2, 1, RED);
        let out = composite(canvas, &foreground, Offset::new(3, 2)).unwrap();

        assert_eq!(*out.get_pixel(3, 2), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(4, 2), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(2, 2), BLUE);
        assert_eq!(*out.get_pixel(4, 1), BLUE);
    }

    #[test]
    fn test_out_of_bounds_fails_loudly() {
        let foreground = RgbaImage::from_pixel(2, 2, RED);
        for offset in [Offset::new(3, 0), Offset::new(0, 3), Offset::new(u32::MAX, 0)] {
            let canvas = RgbImage::from_pixel(4, 4, BLUE);
            let err = composite(canvas, &foreground, offset).unwrap_err();
            assert!(matches!(err, CompositeError::Internal(_)), "{offset}");
        }
    }

    #[test]
    fn test_foreground_same_size_as_canvas() {
        let canvas = RgbImage::from_pixel(3, 2, BLUE);
        let foreground = RgbaImage::from_pixel(3, 2, RED);
        let out = composite(canvas, &foreground, Offset::new(0, 0)).unwrap();
        assert!(out.pixels().all(|p| *p == Rgb([255, 0, 0])));
    }
}

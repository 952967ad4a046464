//! Placement planning: where the foreground's top-left corner goes
//!
//! Every policy returns an offset inside `[0, cw - fw] x [0, ch - fh]`.
//! Randomized policies draw from the caller's generator in a fixed order,
//! so the same seed and inputs always produce the same offset:
//!
//! | Policy    | Draws                                              |
//! |-----------|----------------------------------------------------|
//! | `Center`  | none                                               |
//! | `Random`  | x, then y                                          |
//! | `Thirds`  | candidate index, then x jitter and y jitter if any |
//! | `Corners` | candidate index                                    |

use crate::config::PlacementPolicy;
use crate::geometry::Size;
use crate::types::Offset;
use rand::Rng;
use tracing::trace;

/// Free travel of the foreground on both axes, never negative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Travel {
    max_x: i64,
    max_y: i64,
}

impl Travel {
    fn new(canvas: Size, foreground: Size) -> Self {
        Self {
            max_x: (i64::from(canvas.0) - i64::from(foreground.0)).max(0),
            max_y: (i64::from(canvas.1) - i64::from(foreground.1)).max(0),
        }
    }

    fn clamp(self, x: i64, y: i64) -> (i64, i64) {
        (x.clamp(0, self.max_x), y.clamp(0, self.max_y))
    }
}

/// Compute the top-left offset for a foreground on a canvas
///
/// # Examples
/// ```rust
/// use imgly_bgcomposite::{placement::plan, PlacementPolicy};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let offset = plan(PlacementPolicy::Center, (200, 100), (50, 20), &mut rng);
/// assert_eq!((offset.x, offset.y), (75, 40));
/// ```
pub fn plan<R: Rng>(policy: PlacementPolicy, canvas: Size, foreground: Size, rng: &mut R) -> Offset {
    let travel = Travel::new(canvas, foreground);
    let shorter_side = canvas.0.min(canvas.1);

    let (x, y) = match policy {
        PlacementPolicy::Center => (travel.max_x / 2, travel.max_y / 2),

        PlacementPolicy::Random { margin_ratio } => {
            let margin = ratio_to_pixels(shorter_side, margin_ratio);
            let x = draw_axis(rng, travel.max_x, margin);
            let y = draw_axis(rng, travel.max_y, margin);
            (x, y)
        },

        PlacementPolicy::Thirds { jitter_ratio } => {
            let candidates = thirds_candidates(canvas, foreground);
            let (mut x, mut y) = candidates[rng.random_range(0..candidates.len())];

            let jitter = ratio_to_pixels(shorter_side, jitter_ratio);
            if jitter > 0 {
                x += rng.random_range(-jitter..=jitter);
                y += rng.random_range(-jitter..=jitter);
            }
            travel.clamp(x, y)
        },

        PlacementPolicy::Corners { margin_ratio } => {
            let margin = ratio_to_pixels(shorter_side, margin_ratio);
            let candidates = corner_candidates(travel, margin);
            candidates[rng.random_range(0..candidates.len())]
        },
    };

    trace!(%policy, x, y, max_x = travel.max_x, max_y = travel.max_y, "Placement planned");
    to_offset(travel.clamp(x, y))
}

/// `floor(side * ratio)`, never negative
fn ratio_to_pixels(side: u32, ratio: f64) -> i64 {
    let pixels = (f64::from(side) * ratio).floor();
    if pixels.is_finite() && pixels > 0.0 {
        pixels as i64
    } else {
        0
    }
}

/// Uniform draw in `[margin, max - margin]`, or `[0, max]` when the margin does not fit
fn draw_axis<R: Rng>(rng: &mut R, max: i64, margin: i64) -> i64 {
    let (low, high) = if max > 2 * margin {
        (margin, max - margin)
    } else {
        (0, max)
    };

    if low > high {
        return max / 2;
    }
    rng.random_range(low..=high)
}

/// Top-left positions that center the foreground on each thirds intersection
///
/// Ordered top-left, top-right, bottom-left, bottom-right. `k * c / 3 - f / 2`
/// is evaluated as `(2kc - 3f) / 6` so truncation toward zero is exact.
fn thirds_candidates(canvas: Size, foreground: Size) -> [(i64, i64); 4] {
    let (cw, ch) = (i64::from(canvas.0), i64::from(canvas.1));
    let (fw, fh) = (i64::from(foreground.0), i64::from(foreground.1));
    let at = |k: i64, c: i64, f: i64| (2 * k * c - 3 * f) / 6;

    let (left, right) = (at(1, cw, fw), at(2, cw, fw));
    let (top, bottom) = (at(1, ch, fh), at(2, ch, fh));
    [(left, top), (right, top), (left, bottom), (right, bottom)]
}

/// Corner positions inset by `margin`, each clamped into range
fn corner_candidates(travel: Travel, margin: i64) -> [(i64, i64); 4] {
    let Travel { max_x, max_y } = travel;
    [
        travel.clamp(margin, margin),
        travel.clamp(max_x - margin, margin),
        travel.clamp(margin, max_y - margin),
        travel.clamp(max_x - margin, max_y - margin),
    ]
}

fn to_offset((x, y): (i64, i64)) -> Offset {
    Offset::new(x as u32, y as u32)
}

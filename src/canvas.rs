//! Canvas resolution: the opaque RGB image the foreground is pasted onto

use crate::config::{BackgroundColor, BackgroundMode, CompositeConfig};
use crate::error::{CompositeError, Result};
use crate::geometry::Size;
use image::{DynamicImage, RgbImage};
use tracing::debug;

/// Resolved background for one request
#[derive(Debug, Clone)]
pub enum BackgroundSpec {
    /// No canvas; the refined foreground is the output
    Cutout,
    /// Solid fill, sized from `reference_size` or twice the foreground
    Color {
        color: BackgroundColor,
        reference_size: Option<Size>,
    },
    /// Decoded background image, used at its native size
    Image(DynamicImage),
}

impl BackgroundSpec {
    /// Pair the configured mode with an optional decoded background
    ///
    /// Image mode without a background image is a configuration error. A
    /// background supplied in color mode only lends its size to the canvas.
    pub fn from_config(config: &CompositeConfig, background: Option<DynamicImage>) -> Result<Self> {
        match config.background_mode {
            BackgroundMode::Cutout => Ok(Self::Cutout),
            BackgroundMode::Color => Ok(Self::Color {
                color: config.solid_color,
                reference_size: config
                    .canvas_size
                    .or_else(|| background.as_ref().map(|bg| (bg.width(), bg.height()))),
            }),
            BackgroundMode::Image => background.map(Self::Image).ok_or_else(|| {
                CompositeError::invalid_config("Background mode 'image' requires a background image")
            }),
        }
    }

    #[must_use]
    pub fn mode(&self) -> BackgroundMode {
        match self {
            Self::Cutout => BackgroundMode::Cutout,
            Self::Color { .. } => BackgroundMode::Color,
            Self::Image(_) => BackgroundMode::Image,
        }
    }
}

/// Canvas size for a spec without materializing it
pub fn canvas_size(spec: &BackgroundSpec, foreground: Size) -> Result<Size> {
    match spec {
        BackgroundSpec::Cutout => Err(no_canvas()),
        BackgroundSpec::Color { reference_size, .. } => Ok(reference_size.unwrap_or((
            foreground.0.saturating_mul(2),
            foreground.1.saturating_mul(2),
        ))),
        BackgroundSpec::Image(image) => Ok((image.width(), image.height())),
    }
}

fn no_canvas() -> CompositeError {
    CompositeError::invalid_background_mode("cutout mode has no canvas")
}

/// Build the opaque canvas for a background spec
///
/// Image backgrounds lose any alpha channel; color canvases default to
/// `(2 * fw, 2 * fh)` so a centered foreground covers at most half of
/// each axis.
pub fn build(spec: &BackgroundSpec, foreground: Size) -> Result<RgbImage> {
    let canvas = match spec {
        BackgroundSpec::Color { color, .. } => {
            let (width, height) = canvas_size(spec, foreground)?;
            RgbImage::from_pixel(width, height, color.to_rgb())
        },
        BackgroundSpec::Image(image) => image.to_rgb8(),
        BackgroundSpec::Cutout => return Err(no_canvas()),
    };

    debug!(mode = %spec.mode(), width = canvas.width(), height = canvas.height(), "Canvas built");
    Ok(canvas)
}

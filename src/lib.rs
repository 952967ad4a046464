#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # IMG.LY Background Compositing Library
//!
//! Deterministic compositing of segmented foregrounds onto new backgrounds.
//!
//! Given a foreground image and a segmentation collaborator that makes its
//! background transparent, the library refines the alpha mask, sizes the
//! foreground for the target canvas, picks a position and blends it onto a
//! solid color or a background photo. With a fixed seed every step is
//! bit-reproducible.
//!
//! ## Features
//!
//! - **Mask refinement**: hard alpha cutoff to trim faint segmentation halos
//! - **Scale resolution**: relative scaling with aspect-preserving fit-to-canvas fallback
//! - **Placement policies**: center, random, rule of thirds, corners
//! - **Backgrounds**: cutout (PNG with alpha), solid color or image (JPEG)
//! - **Pluggable segmentation**: any [`Segmenter`], including plain closures
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//! - **Async and Sync APIs**: stream entry points buffer input, then run the sync core
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgly_bgcomposite::{
//!     composite_from_bytes, BackgroundMode, CompositeConfig, PassthroughSegmenter, PlacementMode,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let portrait = std::fs::read("portrait_cutout.png")?;
//! let beach = std::fs::read("beach.jpg")?;
//!
//! let config = CompositeConfig::builder()
//!     .background_mode(BackgroundMode::Image)
//!     .scale_factor(0.4)
//!     .placement_mode(PlacementMode::Thirds)
//!     .seed(42)
//!     .build()?;
//!
//! let mut result = composite_from_bytes(&portrait, Some(beach.as_slice()), &config, PassthroughSegmenter)?;
//! result.save("portrait_on_beach.jpg", config.jpeg_quality)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Segmentation
//!
//! ```rust
//! use imgly_bgcomposite::{segmentation::segmenter_fn, CompositeConfig, CompositeProcessor};
//!
//! // Treat near-white pixels as background
//! let segmenter = segmenter_fn("white-key", |image| {
//!     let mut out = image.clone();
//!     for pixel in out.pixels_mut() {
//!         if pixel.0[..3].iter().all(|&c| c > 240) {
//!             pixel.0[3] = 0;
//!         }
//!     }
//!     Ok(out)
//! });
//!
//! let processor = CompositeProcessor::with_segmenter(CompositeConfig::default(), segmenter)?;
//! assert_eq!(processor.segmenter_name(), "white-key");
//! # Ok::<(), imgly_bgcomposite::CompositeError>(())
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP input decoding
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! imgly-bgcomposite = { version = "0.1", default-features = false }
//! ```

pub mod backends;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod placement;
pub mod processor;
pub mod segmentation;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

use tokio::io::AsyncRead;

// Public API exports
pub use backends::PassthroughSegmenter;
pub use canvas::BackgroundSpec;
pub use config::{
    BackgroundColor, BackgroundMode, CompositeConfig, CompositeConfigBuilder, OutputFormat, PlacementMode,
    PlacementPolicy,
};
pub use error::{CompositeError, Result};
pub use processor::CompositeProcessor;
pub use segmentation::{segmenter_fn, FnSegmenter, Segmenter};
pub use services::{ImageIOService, OutputFormatHandler};
pub use types::{AlphaMask, CompositeMetadata, CompositeResult, MaskStatistics, Offset, ProcessingTimings};
pub use utils::ColorParser;

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Composite encoded foreground bytes onto an optional encoded background
///
/// The background is required in `image` mode, lends its size to the
/// canvas in `color` mode and is ignored for cutouts.
///
/// # Examples
/// ```rust,no_run
/// use imgly_bgcomposite::{composite_from_bytes, BackgroundMode, CompositeConfig, PassthroughSegmenter};
///
/// # fn example(upload_bytes: Vec<u8>) -> anyhow::Result<()> {
/// let config = CompositeConfig::builder()
///     .background_mode(BackgroundMode::Color)
///     .solid_color("#1e90ff".parse()?)
///     .build()?;
/// let result = composite_from_bytes(&upload_bytes, None, &config, PassthroughSegmenter)?;
/// let jpeg_bytes = result.to_bytes(config.jpeg_quality)?;
/// # Ok(())
/// # }
/// ```
pub fn composite_from_bytes<S: Segmenter + 'static>(
    foreground: &[u8],
    background: Option<&[u8]>,
    config: &CompositeConfig,
    segmenter: S,
) -> Result<CompositeResult> {
    let mut processor = CompositeProcessor::with_segmenter(config.clone(), segmenter)?;
    processor.process_bytes(foreground, background)
}

/// Composite a decoded foreground onto an optional decoded background
pub fn composite_from_image<S: Segmenter + 'static>(
    foreground: &image::DynamicImage,
    background: Option<image::DynamicImage>,
    config: &CompositeConfig,
    segmenter: S,
) -> Result<CompositeResult> {
    let mut processor = CompositeProcessor::with_segmenter(config.clone(), segmenter)?;
    processor.process_image(foreground, background)
}

/// Composite a foreground read from an async stream
///
/// The stream is buffered in memory, then handed to the synchronous core.
///
/// # Examples
/// ```rust,no_run
/// use imgly_bgcomposite::{composite_from_reader, CompositeConfig, PassthroughSegmenter};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("portrait_cutout.png").await?;
/// let config = CompositeConfig::default();
/// let mut result = composite_from_reader(file, None, &config, PassthroughSegmenter).await?;
/// result.save("portrait.png", config.jpeg_quality)?;
/// # Ok(())
/// # }
/// ```
pub async fn composite_from_reader<R: AsyncRead + Unpin, S: Segmenter + 'static>(
    reader: R,
    background: Option<&[u8]>,
    config: &CompositeConfig,
    segmenter: S,
) -> Result<CompositeResult> {
    let mut processor = CompositeProcessor::with_segmenter(config.clone(), segmenter)?;
    processor.process_reader(reader, background).await
}

//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{BackgroundColor, BackgroundMode, CompositeConfig, PlacementMode};
use anyhow::{Context, Result};

const MAX_MARGIN_PERCENT: f64 = 20.0;
const MAX_JITTER_PERCENT: f64 = 10.0;

/// Convert CLI arguments to a `CompositeConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: defaults, then the `--config` file, then flags
    pub(crate) fn from_cli(cli: &Cli) -> Result<CompositeConfig> {
        let mut config = match &cli.config {
            Some(path) => CompositeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => CompositeConfig::default(),
        };

        config.background_mode = Self::resolve_mode(cli, config.background_mode);

        if let Some(color) = &cli.color {
            config.solid_color = color.parse::<BackgroundColor>().context("Invalid --color")?;
        }
        if let Some(size) = cli.canvas_size {
            config.canvas_size = Some(size);
        }
        if let Some(scale) = cli.scale {
            config.scale_factor = scale;
        }
        if let Some(placement) = cli.placement {
            config.placement_mode = placement;
        }
        if let Some(margin) = cli.margin {
            config.margin_ratio = margin / 100.0;
        }
        if let Some(jitter) = cli.jitter {
            config.jitter_ratio = jitter / 100.0;
        }
        if let Some(threshold) = cli.alpha_threshold {
            config.alpha_threshold = threshold;
        }
        if let Some(quality) = cli.jpeg_quality {
            config.jpeg_quality = quality;
        }
        if cli.seed.is_some() {
            config.seed = cli.seed;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// `--mode` wins, then `--background` implies image, `--color` implies color
    fn resolve_mode(cli: &Cli, configured: BackgroundMode) -> BackgroundMode {
        match (cli.mode, &cli.background, &cli.color) {
            (Some(mode), _, _) => mode,
            (None, Some(_), _) => BackgroundMode::Image,
            (None, None, Some(_)) => BackgroundMode::Color,
            (None, None, None) => configured,
        }
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if let Some(margin) = cli.margin {
            if !(0.0..=MAX_MARGIN_PERCENT).contains(&margin) {
                anyhow::bail!("--margin must be between 0 and {} percent, got {}", MAX_MARGIN_PERCENT, margin);
            }
        }
        if let Some(jitter) = cli.jitter {
            if !(0.0..=MAX_JITTER_PERCENT).contains(&jitter) {
                anyhow::bail!("--jitter must be between 0 and {} percent, got {}", MAX_JITTER_PERCENT, jitter);
            }
        }
        if let Some(scale) = cli.scale {
            if !scale.is_finite() || scale <= 0.0 {
                anyhow::bail!("--scale must be greater than 0, got {}", scale);
            }
        }
        if let Some(color) = &cli.color {
            color.parse::<BackgroundColor>().context("Invalid --color")?;
        }
        if cli.mode == Some(BackgroundMode::Image) && cli.background.is_none() {
            anyhow::bail!("--mode image requires --background");
        }
        if cli.background.is_some() && cli.mode.is_some_and(|mode| mode != BackgroundMode::Image) {
            log::warn!("--background is only used for its size outside image mode");
        }
        Ok(())
    }
}

pub(crate) fn parse_background_mode(value: &str) -> std::result::Result<BackgroundMode, String> {
    value.parse().map_err(|e: crate::CompositeError| e.to_string())
}

pub(crate) fn parse_placement_mode(value: &str) -> std::result::Result<PlacementMode, String> {
    value.parse().map_err(|e: crate::CompositeError| e.to_string())
}

/// Parse `WIDTHxHEIGHT`, e.g. `1920x1080`
pub(crate) fn parse_canvas_size(value: &str) -> std::result::Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width: u32 = width.trim().parse().map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height: u32 = height.trim().parse().map_err(|e| format!("invalid height '{}': {}", height, e))?;
    if width == 0 || height == 0 {
        return Err(format!("canvas size must be non-zero, got {}x{}", width, height));
    }
    Ok((width, height))
}

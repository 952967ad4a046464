//! Configuration types for compositing operations
//!
//! Mode strings are parsed exactly once, at the boundary, into closed enums.
//! Everything downstream of [`CompositeConfig`] works with typed variants only.

use crate::error::{CompositeError, Result};
use crate::utils::ColorParser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Where the foreground ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackgroundMode {
    /// Emit the refined foreground alone, transparency preserved
    #[default]
    Cutout,
    /// Paste onto a synthesized solid-color canvas
    Color,
    /// Paste onto a decoded background image
    Image,
}

impl std::fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cutout => write!(f, "cutout"),
            Self::Color => write!(f, "color"),
            Self::Image => write!(f, "image"),
        }
    }
}

impl FromStr for BackgroundMode {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cutout" | "transparent" => Ok(Self::Cutout),
            "color" | "colour" | "solid" => Ok(Self::Color),
            "image" => Ok(Self::Image),
            other => Err(CompositeError::invalid_background_mode(format!(
                "'{}' (expected one of: cutout, color, image)",
                other
            ))),
        }
    }
}

impl TryFrom<String> for BackgroundMode {
    type Error = CompositeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BackgroundMode> for String {
    fn from(mode: BackgroundMode) -> Self {
        mode.to_string()
    }
}

/// Named placement strategy, before ratios are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlacementMode {
    #[default]
    Center,
    Random,
    /// Also accepted as `rule_of_thirds`, `rule-of-thirds` or `rule of thirds`
    Thirds,
    Corners,
}

impl std::fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Center => write!(f, "center"),
            Self::Random => write!(f, "random"),
            Self::Thirds => write!(f, "thirds"),
            Self::Corners => write!(f, "corners"),
        }
    }
}

impl FromStr for PlacementMode {
    type Err = CompositeError;

    /// Case-insensitive; spaces and hyphens are treated as underscores,
    /// so `"Rule of Thirds"`, `"rule-of-thirds"` and `"thirds"` all agree.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "center" | "centre" => Ok(Self::Center),
            "random" => Ok(Self::Random),
            "thirds" | "rule_of_thirds" => Ok(Self::Thirds),
            "corners" | "corner" => Ok(Self::Corners),
            _ => Err(CompositeError::invalid_placement_mode(format!(
                "'{}' (expected one of: center, random, thirds, corners)",
                s
            ))),
        }
    }
}

impl TryFrom<String> for PlacementMode {
    type Error = CompositeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PlacementMode> for String {
    fn from(mode: PlacementMode) -> Self {
        mode.to_string()
    }
}

/// Placement strategy with its tuning ratio attached
///
/// Ratios are fractions of the smaller canvas dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PlacementPolicy {
    #[default]
    Center,
    Random { margin_ratio: f64 },
    Thirds { jitter_ratio: f64 },
    Corners { margin_ratio: f64 },
}

impl PlacementPolicy {
    /// Attach the relevant ratio to a placement mode
    #[must_use]
    pub fn from_mode(mode: PlacementMode, margin_ratio: f64, jitter_ratio: f64) -> Self {
        match mode {
            PlacementMode::Center => Self::Center,
            PlacementMode::Random => Self::Random { margin_ratio },
            PlacementMode::Thirds => Self::Thirds { jitter_ratio },
            PlacementMode::Corners => Self::Corners { margin_ratio },
        }
    }

    #[must_use]
    pub fn mode(&self) -> PlacementMode {
        match self {
            Self::Center => PlacementMode::Center,
            Self::Random { .. } => PlacementMode::Random,
            Self::Thirds { .. } => PlacementMode::Thirds,
            Self::Corners { .. } => PlacementMode::Corners,
        }
    }
}

impl std::fmt::Display for PlacementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Center => write!(f, "center"),
            Self::Random { margin_ratio } => write!(f, "random(margin={margin_ratio})"),
            Self::Thirds { jitter_ratio } => write!(f, "thirds(jitter={jitter_ratio})"),
            Self::Corners { margin_ratio } => write!(f, "corners(margin={margin_ratio})"),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG, opaque RGB
    Jpeg,
}

impl OutputFormat {
    /// Cutouts keep their alpha, composites are flattened to JPEG
    #[must_use]
    pub fn for_mode(mode: BackgroundMode) -> Self {
        match mode {
            BackgroundMode::Cutout => Self::Png,
            BackgroundMode::Color | BackgroundMode::Image => Self::Jpeg,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Solid canvas color, serialized as a hex string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::white()
    }
}

impl BackgroundColor {
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    #[must_use]
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    #[must_use]
    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }
}

impl FromStr for BackgroundColor {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        ColorParser::parse_hex(s)
    }
}

impl TryFrom<String> for BackgroundColor {
    type Error = CompositeError;

    fn try_from(value: String) -> Result<Self> {
        ColorParser::parse_hex(&value)
    }
}

impl From<BackgroundColor> for String {
    fn from(color: BackgroundColor) -> Self {
        ColorParser::to_hex(&color, true)
    }
}

/// Configuration for a compositing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Cutout, solid color, or background image
    pub background_mode: BackgroundMode,

    /// Canvas fill for `BackgroundMode::Color`
    pub solid_color: BackgroundColor,

    /// Canvas size for color mode; `None` means twice the foreground size
    pub canvas_size: Option<(u32, u32)>,

    /// Foreground scale relative to its original size (> 0, values above 1 are fit to the canvas)
    pub scale_factor: f64,

    pub placement_mode: PlacementMode,

    /// Safe edge distance for random and corner placement (0.0-0.2)
    pub margin_ratio: f64,

    /// Maximum jitter around thirds intersections (0.0-0.1)
    pub jitter_ratio: f64,

    /// Alpha values below this percentage of 255 become fully transparent (0-100)
    pub alpha_threshold: u8,

    /// Seed for reproducible placement; `None` draws from OS entropy
    pub seed: Option<u64>,

    /// JPEG quality (0-100, only used for composited output)
    pub jpeg_quality: u8,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            background_mode: BackgroundMode::default(),
            solid_color: BackgroundColor::white(),
            canvas_size: None,
            scale_factor: 0.5,
            placement_mode: PlacementMode::default(),
            margin_ratio: 0.05,
            jitter_ratio: 0.02,
            alpha_threshold: 0,
            seed: None,
            jpeg_quality: 90,
        }
    }
}

impl CompositeConfig {
    pub const MAX_MARGIN_RATIO: f64 = 0.2;
    pub const MAX_JITTER_RATIO: f64 = 0.1;

    /// Create a new configuration builder for fluent API construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use imgly_bgcomposite::{BackgroundMode, CompositeConfig, PlacementMode};
    ///
    /// let config = CompositeConfig::builder()
    ///     .background_mode(BackgroundMode::Image)
    ///     .scale_factor(0.4)
    ///     .placement_mode(PlacementMode::Thirds)
    ///     .seed(42)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.seed, Some(42));
    /// ```
    #[must_use]
    pub fn builder() -> CompositeConfigBuilder {
        CompositeConfigBuilder::default()
    }

    /// The placement policy with its ratio attached
    #[must_use]
    pub fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy::from_mode(self.placement_mode, self.margin_ratio, self.jitter_ratio)
    }

    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::for_mode(self.background_mode)
    }

    /// Validate all configuration parameters
    ///
    /// # Validation Rules
    ///
    /// - Scale factor: finite and > 0
    /// - Margin ratio: 0.0-0.2
    /// - Jitter ratio: 0.0-0.1
    /// - Alpha threshold: 0-100
    /// - JPEG quality: 0-100
    /// - Canvas size: both dimensions > 0 when given
    ///
    /// # Examples
    ///
    /// ```rust
    /// use imgly_bgcomposite::CompositeConfig;
    ///
    /// let mut config = CompositeConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.scale_factor = 0.0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(CompositeError::config_value_error(
                "scale factor",
                self.scale_factor,
                "> 0.0",
                Some(0.5),
            ));
        }

        if !(0.0..=Self::MAX_MARGIN_RATIO).contains(&self.margin_ratio) {
            return Err(CompositeError::config_value_error(
                "margin ratio",
                self.margin_ratio,
                "0.0-0.2",
                Some(0.05),
            ));
        }

        if !(0.0..=Self::MAX_JITTER_RATIO).contains(&self.jitter_ratio) {
            return Err(CompositeError::config_value_error(
                "jitter ratio",
                self.jitter_ratio,
                "0.0-0.1",
                Some(0.02),
            ));
        }

        if self.alpha_threshold > 100 {
            return Err(CompositeError::config_value_error(
                "alpha threshold",
                self.alpha_threshold,
                "0-100",
                Some(0),
            ));
        }

        if self.jpeg_quality > 100 {
            return Err(CompositeError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(90),
            ));
        }

        if let Some((width, height)) = self.canvas_size {
            if width == 0 || height == 0 {
                return Err(CompositeError::invalid_config(format!(
                    "Canvas size must be non-zero, got {}x{}",
                    width, height
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate a configuration from JSON
    ///
    /// Missing fields fall back to their defaults. Mode strings go through
    /// the same normalizing parsers as the CLI, and an unknown mode fails
    /// with its own error variant rather than a generic JSON error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CompositeError::invalid_config(format!("Invalid config JSON: {}", e)))?;

        if let Some(mode) = value.get("background_mode").and_then(serde_json::Value::as_str) {
            mode.parse::<BackgroundMode>()?;
        }
        if let Some(mode) = value.get("placement_mode").and_then(serde_json::Value::as_str) {
            mode.parse::<PlacementMode>()?;
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| CompositeError::invalid_config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CompositeError::file_io_error("read config", path, &e))?;
        Self::from_json_str(&json)
    }
}

/// Builder for `CompositeConfig`
#[derive(Debug, Default)]
pub struct CompositeConfigBuilder {
    config: CompositeConfig,
}

impl CompositeConfigBuilder {
    #[must_use]
    pub fn background_mode(mut self, mode: BackgroundMode) -> Self {
        self.config.background_mode = mode;
        self
    }

    #[must_use]
    pub fn solid_color(mut self, color: BackgroundColor) -> Self {
        self.config.solid_color = color;
        self
    }

    /// Fix the color-mode canvas size instead of deriving it from the foreground
    #[must_use]
    pub fn canvas_size(mut self, width: u32, height: u32) -> Self {
        self.config.canvas_size = Some((width, height));
        self
    }

    #[must_use]
    pub fn scale_factor(mut self, scale: f64) -> Self {
        self.config.scale_factor = scale;
        self
    }

    #[must_use]
    pub fn placement_mode(mut self, mode: PlacementMode) -> Self {
        self.config.placement_mode = mode;
        self
    }

    /// Set mode and ratios in one go
    #[must_use]
    pub fn placement_policy(mut self, policy: PlacementPolicy) -> Self {
        self.config.placement_mode = policy.mode();
        match policy {
            PlacementPolicy::Center => {},
            PlacementPolicy::Random { margin_ratio } | PlacementPolicy::Corners { margin_ratio } => {
                self.config.margin_ratio = margin_ratio;
            },
            PlacementPolicy::Thirds { jitter_ratio } => {
                self.config.jitter_ratio = jitter_ratio;
            },
        }
        self
    }

    #[must_use]
    pub fn margin_ratio(mut self, ratio: f64) -> Self {
        self.config.margin_ratio = ratio;
        self
    }

    #[must_use]
    pub fn jitter_ratio(mut self, ratio: f64) -> Self {
        self.config.jitter_ratio = ratio;
        self
    }

    /// Set alpha threshold percent
    ///
    /// Values above 100 are clamped to 100, so `build()` never rejects a
    /// threshold set here. Only directly constructed configs fail validation.
    #[must_use]
    pub fn alpha_threshold(mut self, percent: u8) -> Self {
        self.config.alpha_threshold = percent.min(100);
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set JPEG quality (values > 100 are clamped to 100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    pub fn build(self) -> Result<CompositeConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}

//! Error types for compositing operations

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Error taxonomy for a single compositing request
///
/// Every stage failure aborts the request. Nothing is retried.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoder or pixel-format errors raised by the `image` crate
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Input bytes are not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Scale factor collapses the foreground to zero width or height
    #[error(
        "Degenerate scale: {scale} turns a {width}x{height} foreground into {scaled_width}x{scaled_height}. Increase the scale factor"
    )]
    DegenerateScale {
        scale: f64,
        width: u32,
        height: u32,
        scaled_width: u32,
        scaled_height: u32,
    },

    /// Unrecognized or unusable background mode
    #[error("Invalid background mode: {0}")]
    InvalidBackgroundMode(String),

    /// Unrecognized placement mode string
    #[error("Invalid placement mode: {0}")]
    InvalidPlacementMode(String),

    /// The segmentation collaborator failed; message is passed through as-is
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stage-level processing failure
    #[error("Processing error: {0}")]
    Processing(String),

    /// Broken pixel-level invariant (size mismatch, out-of-bounds paste)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompositeError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_background_mode<S: Into<String>>(mode: S) -> Self {
        Self::InvalidBackgroundMode(mode.into())
    }

    pub fn invalid_placement_mode<S: Into<String>>(mode: S) -> Self {
        Self::InvalidPlacementMode(mode.into())
    }

    /// Create a degenerate scale error from the inputs that produced it
    pub fn degenerate_scale(scale: f64, original: (u32, u32), scaled: (u32, u32)) -> Self {
        Self::DegenerateScale {
            scale,
            width: original.0,
            height: original.1,
            scaled_width: scaled.0,
            scaled_height: scaled.1,
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create decode error with source context
    pub fn image_load_error<P: AsRef<std::path::Path>>(path: P, error: &image::ImageError) -> Self {
        let path_display = path.as_ref().display();
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        Self::Decode(format!(
            "Failed to load image '{}' (format: {}): {}. Supported formats: PNG, JPEG, WebP, TIFF",
            path_display, extension, error
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }
}

//! Hex color parsing for solid-color canvases

use crate::{
    config::BackgroundColor,
    error::{CompositeError, Result},
};

/// Utility for parsing and formatting canvas colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string to a `BackgroundColor`
    ///
    /// Supports both #RRGGBB and #RGB formats; the leading `#` is optional.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgcomposite::utils::ColorParser;
    ///
    /// let blue = ColorParser::parse_hex("#0000FF").unwrap();
    /// assert_eq!((blue.r, blue.g, blue.b), (0, 0, 255));
    ///
    /// let red = ColorParser::parse_hex("f00").unwrap();
    /// assert_eq!((red.r, red.g, red.b), (255, 0, 0));
    /// ```
    pub fn parse_hex(hex: &str) -> Result<BackgroundColor> {
        let digits = hex.trim().trim_start_matches('#');

        if !Self::is_valid_hex(digits) {
            return Err(CompositeError::invalid_config(format!(
                "Color '{}' must be in #RRGGBB or #RGB format",
                hex
            )));
        }

        let value = u32::from_str_radix(digits, 16).map_err(|e| {
            CompositeError::invalid_config(format!("Invalid hex color '{}': {}", hex, e))
        })?;

        let color = if digits.len() == 6 {
            BackgroundColor::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
        } else {
            // #RGB expands each nibble to a full byte (0xF -> 0xFF)
            let nibble = |shift: u32| ((value >> shift) & 0xF) as u8 * 17;
            BackgroundColor::new(nibble(8), nibble(4), nibble(0))
        };

        Ok(color)
    }

    /// Convert a `BackgroundColor` to a lowercase hex string
    pub fn to_hex(color: &BackgroundColor, include_hash: bool) -> String {
        let hex = format!("{:02x}{:02x}{:02x}", color.r, color.g, color.b);
        if include_hash {
            format!("#{hex}")
        } else {
            hex
        }
    }

    /// Validate hex color format without parsing
    pub fn is_valid_hex(hex: &str) -> bool {
        let hex = hex.trim_start_matches('#');

        if hex.len() != 3 && hex.len() != 6 {
            return false;
        }

        hex.chars().all(|c| c.is_ascii_hexdigit())
    }
}

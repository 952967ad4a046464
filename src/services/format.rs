//! Output format handling service
//!
//! Cutouts are PNG with alpha; composites are flattened to opaque JPEG.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use std::io::Cursor;

/// Service for encoding results and describing output formats
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an image in the given format
    ///
    /// JPEG output drops any alpha channel; `jpeg_quality` is ignored for PNG.
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgcomposite::{services::OutputFormatHandler, OutputFormat};
    /// use image::DynamicImage;
    ///
    /// let image = DynamicImage::new_rgba8(4, 4);
    /// let png = OutputFormatHandler::encode(&image, OutputFormat::Png, 90).unwrap();
    /// assert_eq!(&png[1..4], b"PNG");
    /// ```
    pub fn encode(image: &DynamicImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());

        if !Self::supports_transparency(format) && image.color().has_alpha() {
            log::debug!("Dropping alpha channel for {} output", format);
        }

        match format {
            OutputFormat::Png => {
                image
                    .write_to(&mut buffer, image::ImageFormat::Png)
                    .map_err(|e| Self::encode_error(format, &e))?;
            },
            OutputFormat::Jpeg => {
                let rgb_image = image.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100));
                encoder
                    .encode_image(&rgb_image)
                    .map_err(|e| Self::encode_error(format, &e))?;
            },
        }

        Ok(buffer.into_inner())
    }

    fn encode_error(format: OutputFormat, error: &image::ImageError) -> CompositeError {
        CompositeError::processing_stage_error("encode", &error.to_string(), Some(&format.to_string()))
    }

    /// File extension (without the dot)
    ///
    /// ```rust
    /// use imgly_bgcomposite::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Warn when an explicit output path disagrees with the format that will be written
    pub fn warn_on_extension_mismatch(path: &std::path::Path, format: OutputFormat) {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return;
        };
        let matches = match format {
            OutputFormat::Png => extension.eq_ignore_ascii_case("png"),
            OutputFormat::Jpeg => {
                extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg")
            },
        };
        if !matches {
            log::warn!(
                "Output path '{}' has extension '{}' but {} data will be written",
                path.display(),
                extension,
                format
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn translucent_image() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 10, 10, 77])))
    }

    #[test]
    fn test_encode_png_keeps_alpha() {
        let bytes = OutputFormatHandler::encode(&translucent_image(), OutputFormat::Png, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.to_rgba8().get_pixel(3, 3).0, [200, 10, 10, 77]);
    }

    #[test]
    fn test_encode_jpeg_is_opaque() {
        let bytes = OutputFormatHandler::encode(&translucent_image(), OutputFormat::Jpeg, 95).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn test_encode_jpeg_quality_zero_is_accepted() {
        assert!(OutputFormatHandler::encode(&translucent_image(), OutputFormat::Jpeg, 0).is_ok());
    }

    #[test]
    fn test_format_descriptions() {
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::Png));
        assert!(!OutputFormatHandler::supports_transparency(OutputFormat::Jpeg));
    }
}

//! Image I/O operations service
//!
//! Keeps file and stream handling out of the compositing stages so they
//! only ever see decoded pixel buffers.

use crate::{
    config::OutputFormat,
    error::{CompositeError, Result},
    services::OutputFormatHandler,
};
use image::DynamicImage;
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Tries extension-based format detection first and falls back to
    /// sniffing the content, so misnamed files still decode.
    ///
    /// # Errors
    /// `Io` if the file is missing or unreadable, `Decode` if neither
    /// detection method yields an image.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use imgly_bgcomposite::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("portrait.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(CompositeError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| CompositeError::file_io_error("read image data", path_ref, &io_err))?;

                image::load_from_memory(&data).map_err(|content_err| {
                    log::debug!("Content-based detection failed for {}: {}", path_ref.display(), content_err);
                    CompositeError::image_load_error(path_ref, &content_err)
                })
            },
        }
    }

    /// Encode `image` as `format` and write it to `path`
    ///
    /// Parent directories are created as needed. `jpeg_quality` only
    /// applies to JPEG output.
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CompositeError::file_io_error("create output directory", parent, &e))?;
        }

        OutputFormatHandler::warn_on_extension_mismatch(path_ref, format);
        let bytes = OutputFormatHandler::encode(image, format, jpeg_quality)?;
        std::fs::write(path_ref, &bytes).map_err(|e| CompositeError::file_io_error("write image", path_ref, &e))?;

        log::debug!("Wrote {} bytes of {} to {}", bytes.len(), format, path_ref.display());
        Ok(())
    }

    /// Check if a file path has a supported input image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        let Some(ext_str) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return false;
        };

        let ext_lower = ext_str.to_lowercase();
        match ext_lower.as_str() {
            "jpg" | "jpeg" | "png" | "tiff" | "tif" => true,
            "webp" => cfg!(feature = "webp-support"),
            _ => false,
        }
    }

    /// Decode an image from raw bytes, detecting the format from content
    ///
    /// # Examples
    /// ```rust,no_run
    /// use imgly_bgcomposite::services::ImageIOService;
    ///
    /// let image_data = std::fs::read("portrait.jpg")?;
    /// let image = ImageIOService::load_from_bytes(&image_data)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(CompositeError::decode("Image data is empty"));
        }
        image::load_from_memory(bytes)
            .map_err(|e| CompositeError::decode(format!("Failed to decode image from bytes: {}", e)))
    }

    /// Encode an image and write it to an async writer
    ///
    /// Returns the number of bytes written.
    pub async fn save_to_writer<W: tokio::io::AsyncWrite + Unpin>(
        image: &DynamicImage,
        mut writer: W,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<u64> {
        use tokio::io::AsyncWriteExt;

        let bytes = OutputFormatHandler::encode(image, format, jpeg_quality)?;

        AsyncWriteExt::write_all(&mut writer, &bytes)
            .await
            .map_err(|e| CompositeError::processing(format!("Failed to write to stream: {}", e)))?;
        AsyncWriteExt::flush(&mut writer)
            .await
            .map_err(|e| CompositeError::processing(format!("Failed to flush stream: {}", e)))?;

        Ok(bytes.len() as u64)
    }
}

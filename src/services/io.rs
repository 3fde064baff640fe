//! Image I/O operations service
//!
//! This module separates file I/O operations from segmentation and
//! compositing, so the pipeline can be tested on in-memory buffers.

use crate::{
    error::{ExtractionError, Result},
    types::SourceImage,
};
use image::{codecs::jpeg::JpegEncoder, ImageFormat, RgbImage};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load and decode a source photo into an RGB8 buffer
    ///
    /// The format is taken from the file extension first; when that fails, or
    /// the extension is not one [`Self::is_supported_format`] accepts, the
    /// content is sniffed instead, so mislabeled files still load.
    ///
    /// # Errors
    /// - `PermissionDenied` if the file cannot be read for lack of access
    /// - `Decode` if the file is missing, unreadable or not a supported image
    ///
    /// # Examples
    /// ```rust,no_run
    /// use grabcut_bgremove::services::ImageIOService;
    ///
    /// let source = ImageIOService::load_source("photo.jpg")?;
    /// println!("{}x{}", source.dimensions().0, source.dimensions().1);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_source<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
        let path_ref = path.as_ref();

        let data = std::fs::read(path_ref)
            .map_err(|e| ExtractionError::source_io_error(path_ref, e))?;

        let decoded = match ImageFormat::from_path(path_ref) {
            Ok(format) if Self::is_supported_format(path_ref) => {
                image::load_from_memory_with_format(&data, format).or_else(|e| {
                    log::debug!(
                        "Extension-based decoding failed for {}: {}. Trying content detection.",
                        path_ref.display(),
                        e
                    );
                    image::load_from_memory(&data)
                })
            },
            _ => {
                log::debug!(
                    "Unsupported extension on {}, detecting format from content",
                    path_ref.display()
                );
                image::load_from_memory(&data)
            },
        }
        .map_err(|e| ExtractionError::decode_error(path_ref, e))?;

        log::debug!(
            "Loaded {} ({}x{}, {} bytes)",
            path_ref.display(),
            decoded.width(),
            decoded.height(),
            data.len()
        );

        Ok(SourceImage::from_pixels(path_ref, decoded.to_rgb8()))
    }

    /// Encode an RGB buffer as baseline JPEG
    ///
    /// # Errors
    /// `Encode` if the encoder rejects the buffer.
    pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode_image(image)
            .map_err(|e| ExtractionError::encode_error("<memory>", e.to_string()))?;
        Ok(buffer)
    }

    /// Write `bytes` to `path` so that readers never observe a partial file
    ///
    /// Data goes to a temporary file in the destination directory which is
    /// then renamed over `path`. An existing file at `path` is replaced.
    ///
    /// # Errors
    /// - `PermissionDenied` if the destination directory is not writable
    /// - `Encode` for any other write or rename failure
    pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        let parent = match path_ref.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let map_io = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ExtractionError::PermissionDenied(path_ref.to_path_buf())
            } else {
                ExtractionError::encode_error(path_ref, e.to_string())
            }
        };

        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(map_io)?;
        staged.write_all(bytes).map_err(map_io)?;
        staged.flush().map_err(map_io)?;
        staged.persist(path_ref).map_err(|e| map_io(e.error))?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }

    /// Output location for a cutout of `source`: the full source path,
    /// extension included, followed by `suffix`
    ///
    /// `photo.png` with suffix `_tmp.jpg` becomes `photo.png_tmp.jpg`.
    #[must_use]
    pub fn derived_output_path<P: AsRef<Path>>(source: P, suffix: &str) -> PathBuf {
        let mut derived = source.as_ref().as_os_str().to_os_string();
        derived.push(suffix);
        PathBuf::from(derived)
    }

    /// Check if a file path has an extension the decoder understands
    #[must_use]
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| {
                matches!(
                    ext.as_str(),
                    "jpg" | "jpeg" | "png" | "tiff" | "tif" | "bmp"
                ) || (cfg!(feature = "webp-support") && ext == "webp")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::tempdir;

    fn checker(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([250, 250, 250])
            } else {
                Rgb([10, 10, 10])
            }
        })
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("test.jpg"));
        assert!(ImageIOService::is_supported_format("test.JPEG"));
        assert!(ImageIOService::is_supported_format("test.png"));
        assert!(ImageIOService::is_supported_format("test.Tif"));
        assert!(ImageIOService::is_supported_format("test.bmp"));

        assert!(!ImageIOService::is_supported_format("test.txt"));
        assert!(!ImageIOService::is_supported_format("test"));
    }

    #[test]
    fn test_load_png_source() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("input.png");
        checker(16, 12).save(&path).unwrap();

        let source = ImageIOService::load_source(&path).unwrap();
        assert_eq!(source.dimensions(), (16, 12));
        assert_eq!(source.path(), path.as_path());
        assert_eq!(source.pixels(), &checker(16, 12));
    }

    #[test]
    fn test_load_with_wrong_extension_sniffs_content() {
        let temp_dir = tempdir().unwrap();
        let png_path = temp_dir.path().join("real.png");
        checker(8, 8).save(&png_path).unwrap();

        let mislabeled = temp_dir.path().join("actually_png.jpg");
        std::fs::copy(&png_path, &mislabeled).unwrap();

        let source = ImageIOService::load_source(&mislabeled).unwrap();
        assert_eq!(source.dimensions(), (8, 8));
    }

    #[test]
    fn test_load_with_unsupported_extension_sniffs_content() {
        let temp_dir = tempdir().unwrap();
        let png_path = temp_dir.path().join("real.png");
        checker(8, 6).save(&png_path).unwrap();

        for name in ["export.dat", "no_extension"] {
            let renamed = temp_dir.path().join(name);
            std::fs::copy(&png_path, &renamed).unwrap();
            assert!(!ImageIOService::is_supported_format(&renamed));

            let source = ImageIOService::load_source(&renamed).unwrap();
            assert_eq!(source.dimensions(), (8, 6));
            assert_eq!(source.pixels(), &checker(8, 6));
        }
    }

    #[test]
    fn test_load_missing_file_is_decode_error() {
        let temp_dir = tempdir().unwrap();
        let err = ImageIOService::load_source(temp_dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, ExtractionError::Decode { .. }));
    }

    #[test]
    fn test_load_corrupt_file_is_decode_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("corrupt.png");
        std::fs::write(&path, b"This is not an image").unwrap();

        let err = ImageIOService::load_source(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Decode { .. }));
        assert!(err.to_string().contains("corrupt.png"));
    }

    #[test]
    fn test_encode_jpeg_decodes_back() {
        let bytes = ImageIOService::encode_jpeg(&checker(24, 16), 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 16));
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("out.jpg");
        std::fs::write(&path, b"old").unwrap();

        ImageIOService::write_atomic(&path, b"new contents").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new contents");

        // Only the destination is left behind
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("no_such_dir").join("out.jpg");
        let err = ImageIOService::write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, ExtractionError::Encode { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_derived_output_path_keeps_extension() {
        assert_eq!(
            ImageIOService::derived_output_path("/photos/cat.png", "_tmp.jpg"),
            PathBuf::from("/photos/cat.png_tmp.jpg")
        );
        assert_eq!(
            ImageIOService::derived_output_path("dog.jpeg", "_cut.jpg"),
            PathBuf::from("dog.jpeg_cut.jpg")
        );
    }
}

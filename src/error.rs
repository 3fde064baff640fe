//! Error types for foreground extraction operations

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Failure classes surfaced to the caller of the extraction core
///
/// The core only classifies failures; turning them into user-facing messages
/// is left to the caller.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// An operation that needs a loaded image was attempted without one
    #[error("No image loaded")]
    NoImageLoaded,

    /// Extraction was requested before both rectangle corners were picked
    #[error("Selection is incomplete: both corners must be set")]
    IncompleteSelection,

    /// Degenerate or out-of-bounds rectangle
    #[error("Invalid rectangle: {0}")]
    InvalidRectangle(String),

    /// Source image could not be read or decoded
    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Result image could not be encoded or persisted
    #[error("Failed to encode '{}': {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    /// Storage access was denied for the given path
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal processing failure (dimension mismatch and similar)
    #[error("Processing error: {0}")]
    Processing(String),

    /// Input/output errors not tied to decode or encode
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Create a new invalid rectangle error
    pub fn invalid_rectangle<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRectangle(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a decode error for `path`
    pub fn decode_error<P: AsRef<Path>>(path: P, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an encode error for `path`
    pub fn encode_error<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Encode {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Classify an I/O failure on a source path
    ///
    /// Permission failures become `PermissionDenied`, everything else is
    /// reported as a decode failure carrying the original I/O error.
    pub fn source_io_error<P: AsRef<Path>>(path: P, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied(path.as_ref().to_path_buf());
        }
        Self::decode_error(path, image::ImageError::IoError(error))
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

    /// Whether the failure was caused by the caller's input rather than by
    /// the environment
    #[must_use]
    pub fn is_user_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoImageLoaded | Self::IncompleteSelection | Self::InvalidRectangle(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ExtractionError::invalid_rectangle("zero width");
        assert!(matches!(err, ExtractionError::InvalidRectangle(_)));
        assert!(err.is_user_input_error());

        let err = ExtractionError::processing("mask mismatch");
        assert!(matches!(err, ExtractionError::Processing(_)));
        assert!(!err.is_user_input_error());
    }

    #[test]
    fn test_error_display() {
        let err = ExtractionError::invalid_config("empty suffix");
        assert_eq!(err.to_string(), "Invalid configuration: empty suffix");

        let err = ExtractionError::encode_error("/tmp/out.jpg", "disk full");
        assert_eq!(err.to_string(), "Failed to encode '/tmp/out.jpg': disk full");
    }

    #[test]
    fn test_source_io_error_classification() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = ExtractionError::source_io_error("/photos/a.jpg", denied);
        assert!(matches!(
            err,
            ExtractionError::PermissionDenied(ref p) if p == Path::new("/photos/a.jpg")
        ));

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ExtractionError::source_io_error("/photos/b.jpg", missing);
        assert!(matches!(err, ExtractionError::Decode { .. }));
        assert!(err.to_string().contains("/photos/b.jpg"));
    }

    #[test]
    fn test_config_value_error() {
        let err = ExtractionError::config_value_error("iterations", 0, "1-100", Some(5));
        let message = err.to_string();
        assert!(message.contains("iterations"));
        assert!(message.contains("1-100"));
        assert!(message.contains("Recommended: 5"));
    }
}

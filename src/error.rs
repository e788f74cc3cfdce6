// flora-inference 🚀 AGPL-3.0 License

//! Error types for the classification pipeline.

use std::fmt;

/// Result type alias for classification operations.
pub type Result<T> = std::result::Result<T, ClassifyError>;

/// Main error type for the classification pipeline.
#[derive(Debug)]
pub enum ClassifyError {
    /// Error loading the model bundle.
    ModelLoadError(String),
    /// Error during the forward pass.
    InferenceError(String),
    /// Error decoding or preprocessing the input image.
    ImageError(String),
    /// Invalid configuration or argument (e.g. top-K out of range).
    ConfigError(String),
    /// Error parsing the bundle metadata.
    MetadataError(String),
    /// Error loading or querying the category-names mapping.
    LabelMapError(String),
    /// Post-processing error.
    PostProcessingError(String),
    /// Wrapped `std::io::Error`.
    Io(std::io::Error),
    /// Feature not enabled at compile time (e.g. a CUDA build for `--accelerator yes`).
    FeatureNotEnabled(String),
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::MetadataError(msg) => write!(f, "Metadata error: {msg}"),
            Self::LabelMapError(msg) => write!(f, "Label map error: {msg}"),
            Self::PostProcessingError(msg) => write!(f, "Post-processing error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClassifyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::LabelMapError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassifyError::ModelLoadError("test".to_string());
        assert_eq!(err.to_string(), "Model load error: test");

        let err = ClassifyError::LabelMapError("test".to_string());
        assert_eq!(err.to_string(), "Label map error: test");
    }

    #[test]
    fn test_io_error_source() {
        let err: ClassifyError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}

//! Error types for photo-editing operations

use thiserror::Error;

/// Result type alias for photo-editing operations
pub type Result<T> = std::result::Result<T, EditError>;

/// Every failure a request or the server can report
///
/// Input-class variants map to HTTP 400, everything else to 500.
#[derive(Error, Debug)]
pub enum EditError {
    /// No image field in the request, or the upload was empty
    #[error("{0}")]
    MissingInput(String),

    /// A parameter could not be parsed as its expected type
    #[error("Invalid parameter '{name}': '{value}' is not a valid {expected}")]
    InvalidParameter {
        name: String,
        value: String,
        expected: &'static str,
    },

    /// Uploaded bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Filter, encoding, or mask failures
    #[error("Processing error: {0}")]
    Processing(String),

    /// Segmentation model inference failures
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model loading, metadata, or availability errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid server configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (config file not found, bind failures, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EditError {
    /// Create a missing input error
    pub fn missing_input<S: Into<String>>(msg: S) -> Self {
        Self::MissingInput(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<N: Into<String>, V: Into<String>>(
        name: N,
        value: V,
        expected: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
            expected,
        }
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create an inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Create model error with troubleshooting context
    pub fn model_error_with_context<P: AsRef<std::path::Path>>(
        operation: &str,
        model_path: P,
        error: &str,
    ) -> Self {
        Self::Model(format!(
            "Failed to {} model '{}': {}",
            operation,
            model_path.as_ref().display(),
            error
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str) -> Self {
        Self::Processing(format!("Processing failed at stage '{}': {}", stage, details))
    }

    /// Whether the caller, not the server, is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingInput(_) | Self::InvalidParameter { .. } | Self::Decode(_)
        )
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

impl From<image::ImageError> for EditError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
                Self::Decode(err.to_string())
            },
            other => Self::Processing(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EditError::missing_input("no image provided");
        assert!(matches!(err, EditError::MissingInput(_)));

        let err = EditError::invalid_parameter("brightness", "abc", "number");
        assert!(matches!(err, EditError::InvalidParameter { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = EditError::invalid_parameter("rotate", "left", "number");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'rotate': 'left' is not a valid number"
        );

        let err = EditError::missing_input("No image uploaded");
        assert_eq!(err.to_string(), "No image uploaded");

        let err = EditError::processing_stage_error("bilateral", "empty image");
        assert!(err.to_string().contains("bilateral"));
        assert!(err.to_string().contains("empty image"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(EditError::missing_input("x").status_code(), 400);
        assert_eq!(EditError::invalid_parameter("a", "b", "number").status_code(), 400);
        assert_eq!(EditError::decode("bad header").status_code(), 400);
        assert_eq!(EditError::processing("x").status_code(), 500);
        assert_eq!(EditError::inference("x").status_code(), 500);
        assert_eq!(EditError::model("x").status_code(), 500);
        assert_eq!(EditError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_config_value_error() {
        let err = EditError::config_value_error("JPEG quality", 150, "1-100");
        let msg = err.to_string();
        assert!(msg.contains("JPEG quality"));
        assert!(msg.contains("150"));
        assert!(msg.contains("1-100"));
    }

    #[test]
    fn test_image_error_conversion() {
        let decode_err = image::load_from_memory(b"definitely not an image").unwrap_err();
        let err: EditError = decode_err.into();
        assert!(err.is_client_error());
    }
}

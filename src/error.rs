//! Error types for the access log filter
//!
//! None of these ever reach the client. They are logged through `tracing`
//! and the filter degrades to an empty, unmasked or sentinel value instead.

use thiserror::Error;

/// Main error type for access log operations
#[derive(Error, Debug)]
pub enum AccessLogError {
    /// A configuration value could not be parsed
    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    /// Reading the request payload failed midway
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// A structured body could not be parsed for masking
    #[error("Failed to mask body: {0}")]
    Mask(#[from] serde_json::Error),

    /// Writing a line to the sink failed
    #[error("Failed to write access log line: {0}")]
    Sink(#[from] std::io::Error),

    /// Generic error for unexpected failures
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AccessLogError {
    /// Create a generic error from any message
    pub fn from_string(msg: impl Into<String>) -> Self {
        AccessLogError::Other(msg.into())
    }

    pub(crate) fn invalid_config(key: &str, value: &str) -> Self {
        AccessLogError::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AccessLogError::invalid_config("FULL_ACCESS_LOG_ENABLED", "maybe");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for FULL_ACCESS_LOG_ENABLED: \"maybe\""
        );

        let err = AccessLogError::from_string("test error");
        assert_eq!(err.to_string(), "Unexpected error: test error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: AccessLogError = json_err.into();
        assert!(matches!(err, AccessLogError::Mask(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: AccessLogError = io_err.into();
        assert!(matches!(err, AccessLogError::Sink(_)));
        assert!(err.to_string().contains("closed"));
    }
}

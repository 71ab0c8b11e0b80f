//! Error types for the sanitization pipeline.
//!
//! Only setup-time failures surface as errors. Per-record processing is total:
//! malformed JSON, unparseable URLs and budget misses are handled in-band.

use thiserror::Error;

/// Result type for sanitization setup operations.
pub type Result<T> = std::result::Result<T, SanitizeError>;

/// Errors that can occur while building or configuring a sanitizer.
#[derive(Error, Debug)]
pub enum SanitizeError {
    /// Failed to load or interpret the sanitize policy.
    #[error("policy error: {0}")]
    Policy(String),

    /// A path pattern could not be compiled.
    #[error("pattern error: {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    /// A policy field holds an unusable value.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Encryption is enabled but no passphrase was configured.
    #[error("field encryption is enabled but no passphrase is configured")]
    MissingPassphrase,

    /// Key derivation failed.
    #[error("key error: {0}")]
    Key(String),

    /// Encryption or decryption failed.
    /// The message never contains plaintext.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// I/O error during policy file operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SanitizeError {
    /// Stable error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            SanitizeError::Policy(_) => 60,
            SanitizeError::Pattern { .. } => 61,
            SanitizeError::InvalidValue { .. } => 62,
            SanitizeError::MissingPassphrase => 63,
            SanitizeError::Key(_) => 64,
            SanitizeError::Crypto(_) => 65,
            SanitizeError::Io(_) => 66,
            SanitizeError::Json(_) => 67,
        }
    }

    pub(crate) fn pattern(pattern: &str, message: impl Into<String>) -> Self {
        SanitizeError::Pattern {
            pattern: pattern.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        SanitizeError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

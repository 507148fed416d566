//! Error types for the collage layout engine
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use thiserror::Error;

/// Main error type for the acquisition pipeline and layout stages.
///
/// Every failure of a batch surfaces as exactly one of these variants;
/// no partial collage output is ever produced.
#[derive(Error, Debug)]
pub enum CollageError {
    /// Fewer references than the minimum 2x2 grid requires
    #[error(
        "Need at least {minimum} image references to build a collage, got {count}\nSuggestion: Provide more references; input is truncated to the largest perfect square"
    )]
    InsufficientImages { count: usize, minimum: usize },

    /// Network or I/O failure while retrieving one image
    #[error("Failed to fetch image '{reference}': {reason}")]
    Fetch { reference: String, reason: String },

    /// The fetched bytes could not be decoded as an image
    #[error(
        "Failed to decode image '{reference}': {reason}\nSuggestion: Verify the reference points at a supported raster format (PNG/JPEG)"
    )]
    Decode { reference: String, reason: String },

    /// Description or embedding service returned a non-success response
    #[error(
        "{service} service request failed: {reason}\nSuggestion: Check the configured endpoint, model name, and API key"
    )]
    Service { service: ServiceKind, reason: String },

    /// Fusion was handed misaligned vector families; indicates an upstream bug
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors in a batch come from the same vectorizer configuration"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    /// Cache read or write failure
    #[error(
        "Cache error for key '{key}': {source}\nSuggestion: Check disk space and permissions for the cache directory"
    )]
    Cache {
        key: String,
        source: std::io::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

/// Which external service produced a `CollageError::Service`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Description,
    Embedding,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Description => write!(f, "Description"),
            Self::Embedding => write!(f, "Embedding"),
        }
    }
}

impl CollageError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::InsufficientImages { .. } => "INSUFFICIENT_IMAGES",
            Self::Fetch { .. } => "FETCH_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Service {
                service: ServiceKind::Description,
                ..
            } => "DESCRIPTION_SERVICE_ERROR",
            Self::Service {
                service: ServiceKind::Embedding,
                ..
            } => "EMBEDDING_SERVICE_ERROR",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::Cache { .. } => "CACHE_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }
}

/// Result type alias for collage operations
pub type CollageResult<T> = Result<T, CollageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_stable() {
        let err = CollageError::InsufficientImages {
            count: 2,
            minimum: 4,
        };
        assert_eq!(err.status_code(), "INSUFFICIENT_IMAGES");

        let err = CollageError::Service {
            service: ServiceKind::Embedding,
            reason: "quota".into(),
        };
        assert_eq!(err.status_code(), "EMBEDDING_SERVICE_ERROR");
    }

    #[test]
    fn messages_name_the_reference() {
        let err = CollageError::Fetch {
            reference: "https://example.com/a.png".into(),
            reason: "timeout".into(),
        };
        assert!(err.to_string().contains("https://example.com/a.png"));
    }
}

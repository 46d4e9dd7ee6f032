//! Error types for neural query operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all neural crates. Uses `thiserror` for derive macros.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Boxed source error carried by inference failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while parsing, rewriting, or resolving a query.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// The underlying error.
        source: std::io::Error,
        /// The path that was being accessed.
        path: PathBuf,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed structured input.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required input field was absent.
    #[error("[{query}] requires '{field}' field")]
    MissingField {
        /// Query name the field belongs to.
        query: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// Neighbor count outside the accepted range.
    #[error("[{query}] requires 'k' to be greater than 0, got {k}")]
    InvalidNeighborCount {
        /// Query name the field belongs to.
        query: &'static str,
        /// The rejected value.
        k: i64,
    },

    /// Binary wire form could not be read.
    #[error("Wire format error: {0}")]
    Wire(String),

    /// The remote predict call failed.
    #[error("Inference invocation failed: {message}")]
    InferenceInvocation {
        /// Human readable description.
        message: String,
        /// Transport or model error, when one is available.
        #[source]
        source: Option<BoxError>,
        /// Whether a retry could plausibly succeed.
        retryable: bool,
    },

    /// The inference response carried no usable embedding tensor.
    #[error("No vector generated by model '{model_id}': {reason}")]
    NoVectorProduced {
        /// The model that was invoked.
        model_id: String,
        /// Which selector failed to match.
        reason: String,
    },

    /// A single-assignment value was assigned twice.
    #[error("Deferred value assigned more than once")]
    DoubleAssignment,

    /// The rewrite driver gave up before reaching a fixed point.
    #[error("Rewrite did not converge: {0}")]
    RewriteLimitExceeded(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a missing field error for the given query.
    pub fn missing_field(query: &'static str, field: &'static str) -> Self {
        Self::MissingField { query, field }
    }

    /// Create a wire format error.
    pub fn wire(msg: impl Into<String>) -> Self {
        Self::Wire(msg.into())
    }

    /// Create a non-retryable inference failure.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::InferenceInvocation {
            message: msg.into(),
            source: None,
            retryable: false,
        }
    }

    /// Create an inference failure that a retry may clear (timeouts, 5xx).
    pub fn inference_transient(msg: impl Into<String>) -> Self {
        Self::InferenceInvocation {
            message: msg.into(),
            source: None,
            retryable: true,
        }
    }

    /// Create an inference failure wrapping a source error.
    pub fn inference_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
        retryable: bool,
    ) -> Self {
        Self::InferenceInvocation {
            message: msg.into(),
            source: Some(Box::new(source)),
            retryable,
        }
    }

    /// Create a no-vector error for the given model.
    pub fn no_vector(model_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoVectorProduced {
            model_id: model_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error with the offending path attached.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::IoWithPath {
            source,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Whether the operation that produced this error may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InferenceInvocation { retryable, .. } => *retryable,
            Self::Io(_) | Self::IoWithPath { .. } => true,
            _ => false,
        }
    }

    /// Whether this error came from resolving an embedding.
    pub fn is_inference_failure(&self) -> bool {
        matches!(
            self,
            Self::InferenceInvocation { .. } | Self::NoVectorProduced { .. }
        )
    }
}

/// Result type alias using the neural `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field("neural", "model_id");
        assert_eq!(err.to_string(), "[neural] requires 'model_id' field");
    }

    #[test]
    fn test_invalid_neighbor_count_message() {
        let err = Error::InvalidNeighborCount {
            query: "neural",
            k: 0,
        };
        assert!(err.to_string().contains("greater than 0, got 0"));
    }

    #[test]
    fn test_inference_retryability() {
        assert!(!Error::inference("model not deployed").is_retryable());
        assert!(Error::inference_transient("timed out").is_retryable());
        assert!(!Error::no_vector("m1", "no tensor").is_retryable());
        assert!(!Error::DoubleAssignment.is_retryable());
    }

    #[test]
    fn test_inference_with_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::inference_with_source("predict call failed", io, true);

        assert!(err.is_retryable());
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "reset");
    }

    #[test]
    fn test_inference_failure_classification() {
        assert!(Error::inference("x").is_inference_failure());
        assert!(Error::no_vector("m", "r").is_inference_failure());
        assert!(!Error::parse("x").is_inference_failure());
        assert!(!Error::missing_field("neural", "doc").is_inference_failure());
    }

    #[test]
    fn test_io_with_path_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io_with_path(io, "/etc/neural/config.toml");
        assert!(err.to_string().contains("/etc/neural/config.toml"));
    }

    #[test]
    fn test_io_from_conversion() {
        let io = std::io::Error::other("boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

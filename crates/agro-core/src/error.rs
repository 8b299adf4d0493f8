//! Error types for data operations.
//!
//! This module defines [`AgroError`] which covers every failure that can cross
//! a provider boundary, plus the internal failures reported by upstream
//! clients before a provider decides whether to recover from them.

use thiserror::Error;

/// Errors that can occur during data operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgroError {
    /// The requested entity (crop, scheme) is unknown to every source.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up, e.g. `"crop"` or `"scheme"`.
        kind: &'static str,
        /// The identifier that was requested.
        id: String,
    },

    /// An upstream call failed and no fallback data exists for it.
    #[error("Upstream {source_name} unavailable: {message}")]
    UpstreamUnavailable {
        /// Name of the upstream source.
        source_name: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// A required request parameter was missing or empty.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Network-related errors (connection failures, timeouts, bad status).
    #[error("Network error: {0}")]
    Network(String),

    /// Error parsing an upstream payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The static scheme catalogue is malformed.
    #[error("Catalogue error: {0}")]
    Catalogue(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl AgroError {
    /// Shorthand for a [`AgroError::NotFound`] error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a [`AgroError::UpstreamUnavailable`] error.
    #[must_use]
    pub fn upstream(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// HTTP status code the API layer should answer with for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::UpstreamUnavailable { .. } => 502,
            Self::Network(_)
            | Self::Parse(_)
            | Self::Config(_)
            | Self::Catalogue(_)
            | Self::Other(_) => 500,
        }
    }
}

/// Result type alias using [`AgroError`].
pub type Result<T> = std::result::Result<T, AgroError>;

//! Error types for the nsherd system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for nsherd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the nsherd system
#[derive(Error, Debug)]
pub enum Error {
    /// Desired-state source errors (container discovery etc.)
    #[error("record source error: {0}")]
    Source(String),

    /// Endpoint discovery errors
    #[error("endpoint discovery error: {0}")]
    Discovery(String),

    /// DNS provider call failures
    #[error("provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Provider auto-detection / nameserver lookup errors
    #[error("provider resolution error: {0}")]
    Resolver(String),

    /// Hostname decomposition errors
    #[error("domain error: {0}")]
    Domain(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a record source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create an endpoint discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a provider call error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider resolution error
    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver(msg.into())
    }

    /// Create a domain decomposition error
    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

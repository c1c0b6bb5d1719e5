//! Error types for the ADF system
//!
//! This module defines all error types used throughout the crate.

use std::net::IpAddr;
use thiserror::Error;

/// Result type alias for ADF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ADF system
#[derive(Error, Debug)]
pub enum Error {
    /// Own-address lookup errors
    #[error("Address resolver error: {0}")]
    AddressResolver(String),

    /// DNS directory errors (read/add/remove of address records)
    #[error("DNS directory error: {0}")]
    DnsDirectory(String),

    /// Health-check predicate errors
    ///
    /// Never crosses the executor boundary: the executor maps it to a failed check.
    #[error("Health check error: {0}")]
    HealthCheck(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent modification reported by a provider
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The node failed its own health check `attempts` times in a row
    #[error("Self-check failed for {address} after {attempts} attempt(s)")]
    SelfCheckFailed {
        /// The node's own address
        address: IpAddr,
        /// Attempts consumed before giving up
        attempts: usize,
    },

    /// A timed-out check could not be killed and reaped
    #[error("Failed to reclaim check execution: {0}")]
    Reclaim(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an address resolver error
    pub fn address_resolver(msg: impl Into<String>) -> Self {
        Self::AddressResolver(msg.into())
    }

    /// Create a DNS directory error
    pub fn dns_directory(msg: impl Into<String>) -> Self {
        Self::DnsDirectory(msg.into())
    }

    /// Create a health check error
    pub fn health_check(msg: impl Into<String>) -> Self {
        Self::HealthCheck(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a reclamation error
    pub fn reclaim(msg: impl Into<String>) -> Self {
        Self::Reclaim(msg.into())
    }

    /// Whether this error must terminate the process
    ///
    /// Only an exhausted self-check and a failed reclamation are fatal.
    /// Everything else aborts at most the current tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SelfCheckFailed { .. } | Self::Reclaim(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

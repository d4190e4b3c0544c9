//! Error types for the ScrapeKit client core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole client core.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Every variant is terminal
/// for the current operation only; callers keep their previous valid state.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ScrapeKitError {
    /// Input rejected before any network call was attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Login rejected by the backend
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Non-2xx response on an authenticated endpoint
    #[error("Request rejected by the backend ({status}): {message}")]
    Fetch { status: u16, message: String },

    /// The request itself could not be completed (connect, timeout, decode)
    #[error("Network error: {0}")]
    Network(String),

    /// Host storage failure (state snapshot read/write)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },
}

impl ScrapeKitError {
    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Creates a Fetch error
    pub fn fetch(status: u16, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Check if this is a Fetch error
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Check if this is a Network error
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Check if the backend rejected the request as unauthenticated.
    ///
    /// Returns true for `Fetch` errors with a 401 status. The session
    /// manager uses this to drop a token the backend no longer accepts.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Fetch { status: 401, .. })
    }
}

impl From<std::io::Error> for ScrapeKitError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for ScrapeKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ScrapeKitError>`.
pub type Result<T> = std::result::Result<T, ScrapeKitError>;

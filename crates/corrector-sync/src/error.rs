//! # Sync Error Types
//!
//! Failures of the feed, the report sink and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │      HTTP       │  │       Payload           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Http           │  │  DeserializationFailed  │ │
//! │  │  InvalidUrl     │  │  HttpStatus     │  │  InvalidReceipt         │ │
//! │  │  ConfigLoad/Save│  │  ReportRejected │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │      Core       │                                                   │
//! │  │   (CoreError)   │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use corrector_core::CoreError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // HTTP Errors
    // =========================================================================
    /// Request never got a response.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The webhook answered, but not with the expected acknowledgement.
    #[error("Report rejected by webhook: {body}")]
    ReportRejected { body: String },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// A portal receipt could not be mapped.
    #[error("Receipt {document} is invalid: {reason}")]
    InvalidReceipt { document: u32, reason: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::DeserializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the request may succeed when sent again.
    ///
    /// Transport failures and 5xx answers are retryable; anything the server
    /// rejected on its merits is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Http(_) => true,
            SyncError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

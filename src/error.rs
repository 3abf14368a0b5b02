//! Error types for hsclient
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using HsError
pub type Result<T> = std::result::Result<T, HsError>;

/// Error code used for every client-side transport failure
pub const TRANSPORT_ERROR_CODE: i32 = -1;

/// Unified error type for hsclient operations
#[derive(Debug, Error)]
pub enum HsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration / Argument Errors (raised before any network I/O)
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Wire Errors
    // -------------------------------------------------------------------------
    /// Connection-level failure. Fatal to the in-flight batch.
    #[error("Transport error {code}: {message}")]
    Transport { code: i32, message: String },

    /// The server rejected one operation. The connection stays usable.
    #[error("Protocol error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("Malformed wire data: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Session State Errors
    // -------------------------------------------------------------------------
    #[error("Session is not connected")]
    NotConnected,

    #[error("Session is faulted; reconnect before reuse")]
    Faulted,

    #[error("Timed out waiting for a pooled session")]
    PoolTimeout,
}

impl HsError {
    /// Build a transport error with the generic client-side code
    pub fn transport(message: impl Into<String>) -> Self {
        HsError::Transport {
            code: TRANSPORT_ERROR_CODE,
            message: message.into(),
        }
    }

    /// Error code carried by wire-level errors, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            HsError::Transport { code, .. } | HsError::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error leaves the connection unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, HsError::Transport { .. } | HsError::Io(_) | HsError::Faulted)
    }
}

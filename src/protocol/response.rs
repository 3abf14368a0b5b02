//! Response definitions
//!
//! `WireResponse` is one decoded response line; `ResponseRecord` is the
//! per-operation result handed back to callers.

use crate::error::{HsError, Result};

use super::{Field, Row};

/// One response line as it appears on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    /// 0 on success, positive for server-side rejections
    pub code: i32,

    /// Values per row (1 for failures)
    pub field_count: usize,

    /// Flat value list, or the single error message for failures
    pub values: Vec<Field>,
}

impl WireResponse {
    /// A success line carrying `rows` of `field_count` values each
    pub fn rows(field_count: usize, rows: Vec<Row>) -> Self {
        Self {
            code: 0,
            field_count,
            values: rows.into_iter().flatten().collect(),
        }
    }

    /// A bare success line (`0 1`) used to acknowledge writes and opens
    pub fn ack() -> Self {
        Self {
            code: 0,
            field_count: 1,
            values: Vec::new(),
        }
    }

    /// A failure line (`<code> 1 <message>`)
    pub fn error(code: i32, message: &str) -> Self {
        Self {
            code,
            field_count: 1,
            values: vec![Some(message.as_bytes().to_vec())],
        }
    }

    /// Error message carried by a failure line
    pub fn message(&self) -> String {
        self.values
            .first()
            .and_then(|v| v.as_deref())
            .map(|m| String::from_utf8_lossy(m).into_owned())
            .unwrap_or_default()
    }
}

/// Result of one operation
///
/// A record never mixes rows with an error: a success has no message and rows
/// of uniform width; a failure has a message and no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub error_code: i32,
    pub error_message: Option<String>,
    pub rows: Vec<Row>,
}

impl ResponseRecord {
    /// Create a successful record
    pub fn success(rows: Vec<Row>) -> Self {
        Self {
            error_code: 0,
            error_message: None,
            rows,
        }
    }

    /// Create a failed record
    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            error_code: code,
            error_message: Some(message.into()),
            rows: Vec::new(),
        }
    }

    /// Turn a wire-level error into a record
    pub fn from_error(error: &HsError) -> Self {
        match error {
            HsError::Transport { code, message } | HsError::Protocol { code, message } => {
                Self::failure(*code, message.clone())
            }
            other => Self::failure(crate::error::TRANSPORT_ERROR_CODE, other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }

    /// Negative codes come from the client side of the connection
    pub fn is_transport_error(&self) -> bool {
        self.error_code < 0
    }

    pub fn is_protocol_error(&self) -> bool {
        self.error_code > 0
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All values in row order, flattened
    pub fn flat_values(&self) -> impl Iterator<Item = &Field> {
        self.rows.iter().flatten()
    }

    /// Convert to rows, surfacing an in-band failure as an error
    pub fn into_rows(self) -> Result<Vec<Row>> {
        let message = self.error_message.unwrap_or_default();
        match self.error_code {
            0 => Ok(self.rows),
            code if code < 0 => Err(HsError::Transport { code, message }),
            code => Err(HsError::Protocol { code, message }),
        }
    }
}

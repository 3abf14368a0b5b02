//! Response cursor and error bookkeeping shared by the transports

use crate::error::{HsError, TRANSPORT_ERROR_CODE};
use crate::protocol::{Field, Row, WireResponse};

use super::ResponseHeader;

/// The response currently being read
#[derive(Debug, Default)]
pub(crate) struct ResponseCursor {
    current: Option<Current>,
}

#[derive(Debug)]
struct Current {
    field_count: usize,
    values: std::vec::IntoIter<Field>,
}

impl ResponseCursor {
    /// Make `response` the current one and return its header
    ///
    /// Failure lines keep no rows; the caller records their message.
    pub fn load(&mut self, response: WireResponse) -> ResponseHeader {
        let header = ResponseHeader {
            code: response.code,
            field_count: response.field_count,
        };

        let values = if response.code == 0 {
            response.values
        } else {
            Vec::new()
        };

        self.current = Some(Current {
            field_count: response.field_count,
            values: values.into_iter(),
        });
        header
    }

    /// Next row; a trailing partial row is returned as is
    pub fn next_row(&mut self) -> Option<Row> {
        let current = self.current.as_mut()?;
        if current.field_count == 0 {
            return None;
        }

        let row: Row = current.values.by_ref().take(current.field_count).collect();
        if row.is_empty() {
            None
        } else {
            Some(row)
        }
    }

    pub fn release(&mut self) {
        self.current = None;
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}

/// Last failure seen by a transport
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorState {
    code: i32,
    message: String,
}

impl ErrorState {
    pub fn clear(&mut self) {
        self.code = 0;
        self.message.clear();
    }

    /// Record a server-side rejection
    pub fn set(&mut self, code: i32, message: impl Into<String>) {
        self.code = code;
        self.message = message.into();
    }

    /// Record a connection failure and return it as an error
    pub fn fail(&mut self, message: impl Into<String>) -> HsError {
        self.code = TRANSPORT_ERROR_CODE;
        self.message = message.into();
        HsError::Transport {
            code: self.code,
            message: self.message.clone(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

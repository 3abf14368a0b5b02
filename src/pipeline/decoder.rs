//! Result decoder
//!
//! Turns the response currently at the head of a transport into a
//! `ResponseRecord`. Shared by batched and single-operation execution.

use crate::error::{HsError, Result};
use crate::protocol::ResponseRecord;
use crate::transport::{receive_status, Transport};

/// Reads one response into a record
pub struct ResultDecoder;

impl ResultDecoder {
    /// Receive and decode the next response
    ///
    /// Returns `Err` only for transport failures, including a negative code
    /// read off the wire. A server-side rejection is a record with the code
    /// and message and no rows. The response buffer is left in place;
    /// releasing it is the caller's step.
    pub fn decode<T: Transport + ?Sized>(transport: &mut T) -> Result<ResponseRecord> {
        let header = receive_status(transport)?;

        if header.code != 0 {
            return Ok(ResponseRecord::failure(
                header.code,
                transport.last_error_message(),
            ));
        }

        let mut rows = Vec::new();
        while let Some(row) = transport.next_row()? {
            if row.len() != header.field_count {
                return Err(HsError::transport(format!(
                    "row {} has {} fields, response declared {}",
                    rows.len(),
                    row.len(),
                    header.field_count
                )));
            }
            rows.push(row);
        }

        tracing::trace!(
            "Decoded response: {} row(s) x {} field(s)",
            rows.len(),
            header.field_count
        );
        Ok(ResponseRecord::success(rows))
    }
}

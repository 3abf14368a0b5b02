//! Transport Module
//!
//! The byte-level side of a connection. Everything above this trait only
//! relies on two wire guarantees: one response per request, and responses in
//! request order.
//!
//! ## Implementations
//! - [`TcpTransport`]: blocking TCP socket
//! - [`MemoryTransport`]: in-process connection to a [`crate::memory::MemoryServer`]

mod cursor;
mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

pub(crate) use cursor::{ErrorState, ResponseCursor};

use crate::error::{HsError, Result};
use crate::index::IndexHandle;
use crate::operation::Operation;
use crate::protocol::Row;

/// Status line of a received response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    /// 0 on success; positive when the server rejected the request; a
    /// negative code from the wire means the connection is unusable
    pub code: i32,

    /// Values per row
    pub field_count: usize,
}

/// Receive the next status line, treating a negative code as a transport
/// failure whatever the transport reported it as
///
/// The response buffer is left unreleased on failure.
pub fn receive_status<T: Transport + ?Sized>(transport: &mut T) -> Result<ResponseHeader> {
    let header = transport.receive_response()?;
    if header.code < 0 {
        return Err(HsError::Transport {
            code: header.code,
            message: transport.last_error_message(),
        });
    }
    Ok(header)
}

/// A connection that buffers requests, sends them in one flush, and hands
/// back responses one at a time
///
/// Failures of the connection itself come back as `HsError::Transport` with
/// a negative code. A server-side rejection is *not* an error at this level:
/// `receive_response` returns a header with a positive code and
/// `last_error_message` holds the server's message.
pub trait Transport {
    /// Queue an open-index request; nothing is sent yet
    fn buffer_open_index(&mut self, handle: &IndexHandle);

    /// Queue a generic-execute request; nothing is sent yet
    fn buffer_execute(&mut self, operation: &Operation);

    /// Send every queued request in one write
    fn flush_send(&mut self) -> Result<()>;

    /// Read the status line of the next response
    fn receive_response(&mut self) -> Result<ResponseHeader>;

    /// Next row of the current response, `None` once exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Drop the current response so the next one can be received
    fn release_response(&mut self);

    /// Code of the last failure (0 when the last call succeeded)
    fn last_error_code(&self) -> i32;

    /// Message of the last failure
    fn last_error_message(&self) -> String;

    /// True when nothing is buffered, in flight, or partially read
    fn is_stable_point(&self) -> bool;

    /// Drop the connection and every pending state
    fn close(&mut self);

    /// Close, then establish a fresh connection
    fn reconnect(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn buffer_open_index(&mut self, handle: &IndexHandle) {
        (**self).buffer_open_index(handle)
    }

    fn buffer_execute(&mut self, operation: &Operation) {
        (**self).buffer_execute(operation)
    }

    fn flush_send(&mut self) -> Result<()> {
        (**self).flush_send()
    }

    fn receive_response(&mut self) -> Result<ResponseHeader> {
        (**self).receive_response()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        (**self).next_row()
    }

    fn release_response(&mut self) {
        (**self).release_response()
    }

    fn last_error_code(&self) -> i32 {
        (**self).last_error_code()
    }

    fn last_error_message(&self) -> String {
        (**self).last_error_message()
    }

    fn is_stable_point(&self) -> bool {
        (**self).is_stable_point()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn reconnect(&mut self) -> Result<()> {
        (**self).reconnect()
    }
}

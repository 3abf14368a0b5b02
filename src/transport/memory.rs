//! In-process transport
//!
//! Routes every request through the real codec into a [`ServerConnection`],
//! so pipelining behaves exactly as over a socket. Faults can be injected to
//! exercise the failure paths.

use bytes::BytesMut;

use crate::error::Result;
use crate::index::IndexHandle;
use crate::memory::{MemoryServer, ServerConnection};
use crate::operation::Operation;
use crate::protocol::{decode_response, encode_execute, encode_open_index, split_line, Row};

use super::{ErrorState, ResponseCursor, ResponseHeader, Transport};

/// In-process connection to a [`MemoryServer`]
#[derive(Debug)]
pub struct MemoryTransport {
    server: MemoryServer,

    /// `None` once closed
    connection: Option<ServerConnection>,

    write_buf: BytesMut,
    read_buf: BytesMut,
    buffered: usize,
    in_flight: usize,
    cursor: ResponseCursor,
    error: ErrorState,

    // -------------------------------------------------------------------------
    // Fault injection and counters
    // -------------------------------------------------------------------------
    fail_next_send: bool,

    /// Receives left before the connection drops
    receive_budget: Option<usize>,

    flushes: usize,
    requests_sent: usize,
}

impl MemoryTransport {
    /// Open a connection to `server`
    pub fn connect(server: &MemoryServer) -> Self {
        Self {
            server: server.clone(),
            connection: Some(server.connect()),
            write_buf: BytesMut::new(),
            read_buf: BytesMut::new(),
            buffered: 0,
            in_flight: 0,
            cursor: ResponseCursor::default(),
            error: ErrorState::default(),
            fail_next_send: false,
            receive_budget: None,
            flushes: 0,
            requests_sent: 0,
        }
    }

    /// Make the next flush fail as a broken connection would
    pub fn fail_next_send(&mut self) {
        self.fail_next_send = true;
    }

    /// Drop the connection after `count` more successful receives
    pub fn fail_receive_after(&mut self, count: usize) {
        self.receive_budget = Some(count);
    }

    /// Number of successful flushes so far
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Number of request lines delivered to the server so far
    pub fn requests_sent(&self) -> usize {
        self.requests_sent
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn drop_connection(&mut self) {
        self.connection = None;
        self.write_buf.clear();
        self.read_buf.clear();
        self.buffered = 0;
        self.in_flight = 0;
        self.cursor.release();
    }
}

impl Transport for MemoryTransport {
    fn buffer_open_index(&mut self, handle: &IndexHandle) {
        encode_open_index(&mut self.write_buf, handle);
        self.buffered += 1;
    }

    fn buffer_execute(&mut self, operation: &Operation) {
        encode_execute(&mut self.write_buf, operation);
        self.buffered += 1;
    }

    fn flush_send(&mut self) -> Result<()> {
        self.error.clear();

        if std::mem::take(&mut self.fail_next_send) {
            self.drop_connection();
            return Err(self.error.fail("write: failed: connection reset by peer"));
        }

        let Some(connection) = self.connection.as_mut() else {
            self.write_buf.clear();
            self.buffered = 0;
            return Err(self.error.fail("write: not connected"));
        };

        let served = connection.serve(&mut self.write_buf, &mut self.read_buf);
        self.in_flight += served;
        self.requests_sent += served;
        self.buffered = 0;
        self.flushes += 1;
        Ok(())
    }

    fn receive_response(&mut self) -> Result<ResponseHeader> {
        self.error.clear();
        self.cursor.release();

        if self.in_flight == 0 {
            return Err(self.error.fail("response_recv: no request sent"));
        }
        if self.connection.is_none() {
            return Err(self.error.fail("read: not connected"));
        }
        if let Some(budget) = self.receive_budget.as_mut() {
            if *budget == 0 {
                self.receive_budget = None;
                self.drop_connection();
                return Err(self.error.fail("read: eof"));
            }
            *budget -= 1;
        }

        let Some(line) = split_line(&mut self.read_buf) else {
            return Err(self.error.fail("read: eof"));
        };
        self.in_flight -= 1;

        let response = match decode_response(&line) {
            Ok(response) => response,
            Err(e) => return Err(self.error.fail(format!("parse: {}", e))),
        };

        if response.code != 0 {
            self.error.set(response.code, response.message());
        }
        Ok(self.cursor.load(response))
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.cursor.next_row())
    }

    fn release_response(&mut self) {
        self.cursor.release();
    }

    fn last_error_code(&self) -> i32 {
        self.error.code()
    }

    fn last_error_message(&self) -> String {
        self.error.message().to_string()
    }

    fn is_stable_point(&self) -> bool {
        self.buffered == 0 && self.in_flight == 0 && !self.cursor.is_open() && self.read_buf.is_empty()
    }

    fn close(&mut self) {
        self.drop_connection();
    }

    fn reconnect(&mut self) -> Result<()> {
        self.drop_connection();
        self.error.clear();
        self.connection = Some(self.server.connect());
        Ok(())
    }
}

//! TCP transport
//!
//! Blocking socket connection speaking the text-line wire format.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use bytes::BytesMut;

use crate::config::Config;
use crate::error::{HsError, Result};
use crate::index::IndexHandle;
use crate::operation::Operation;
use crate::protocol::{decode_response, encode_execute, encode_open_index, read_line, Row};

use super::{ErrorState, ResponseCursor, ResponseHeader, Transport};

/// Socket halves of a live connection
struct Stream {
    /// TCP stream reader (buffered so one read can serve several lines)
    reader: BufReader<TcpStream>,

    /// TCP stream writer
    writer: BufWriter<TcpStream>,
}

/// Client connection over TCP
pub struct TcpTransport {
    config: Config,

    /// Resolved address, reused by reconnect
    addr: SocketAddr,

    /// `None` once closed
    stream: Option<Stream>,

    /// Encoded requests not yet sent
    write_buf: BytesMut,

    /// Requests sitting in `write_buf`
    buffered: usize,

    /// Requests sent whose response has not been received
    in_flight: usize,

    cursor: ResponseCursor,
    line: Vec<u8>,
    error: ErrorState,
}

impl TcpTransport {
    /// Validate the config, then connect
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let addr = config
            .address()
            .to_socket_addrs()
            .map_err(|e| HsError::transport(format!("resolve {}: {}", config.address(), e)))?
            .next()
            .ok_or_else(|| HsError::transport(format!("resolve {}: no address", config.address())))?;

        let mut transport = Self {
            config: config.clone(),
            addr,
            stream: None,
            write_buf: BytesMut::with_capacity(4096),
            buffered: 0,
            in_flight: 0,
            cursor: ResponseCursor::default(),
            line: Vec::new(),
            error: ErrorState::default(),
        };
        transport.open_stream()?;
        Ok(transport)
    }

    /// Peer address this transport connects to
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn open_stream(&mut self) -> Result<()> {
        let timeout = self.config.timeout();

        let stream = TcpStream::connect_timeout(&self.addr, timeout)
            .map_err(|e| self.error.fail(format!("connect: {}: {}", self.addr, e)))?;

        let configure = |stream: &TcpStream| -> io::Result<TcpStream> {
            // Disable Nagle's algorithm: pipelined batches are flushed explicitly
            stream.set_nodelay(true)?;
            stream.set_read_timeout(Some(timeout))?;
            stream.set_write_timeout(Some(timeout))?;
            stream.try_clone()
        };
        let read_stream = configure(&stream)
            .map_err(|e| self.error.fail(format!("connect: setsockopt: {}", e)))?;

        tracing::debug!("Connected to {}", self.addr);

        self.stream = Some(Stream {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        });
        self.error.clear();
        Ok(())
    }

    fn reset_pending(&mut self) {
        self.write_buf.clear();
        self.buffered = 0;
        self.in_flight = 0;
        self.cursor.release();
    }
}

fn describe_read_error(error: &HsError) -> String {
    match error {
        HsError::Io(e) => match e.kind() {
            io::ErrorKind::UnexpectedEof => "read: eof".to_string(),
            // Windows reports TimedOut instead of WouldBlock
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => "read: timeout".to_string(),
            _ => format!("read: failed: {}", e),
        },
        other => format!("read: {}", other),
    }
}

impl Transport for TcpTransport {
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

        let Some(stream) = self.stream.as_mut() else {
            self.write_buf.clear();
            self.buffered = 0;
            return Err(self.error.fail("write: not connected"));
        };

        let sent = stream
            .writer
            .write_all(&self.write_buf)
            .and_then(|_| stream.writer.flush());

        let count = self.buffered;
        self.write_buf.clear();
        self.buffered = 0;

        match sent {
            Ok(()) => {
                self.in_flight += count;
                tracing::trace!("Sent {} request(s) to {}", count, self.addr);
                Ok(())
            }
            Err(e) => Err(self.error.fail(format!("write: failed: {}", e))),
        }
    }

    fn receive_response(&mut self) -> Result<ResponseHeader> {
        self.error.clear();
        self.cursor.release();

        if self.in_flight == 0 {
            return Err(self.error.fail("response_recv: no request sent"));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.error.fail("read: not connected"));
        };

        if let Err(e) = read_line(&mut stream.reader, &mut self.line) {
            let message = describe_read_error(&e);
            return Err(self.error.fail(message));
        }
        self.in_flight -= 1;

        let response = match decode_response(&self.line) {
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
        self.buffered == 0
            && self.in_flight == 0
            && !self.cursor.is_open()
            && self
                .stream
                .as_ref()
                .map(|s| s.reader.buffer().is_empty())
                .unwrap_or(true)
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Closed connection to {}", self.addr);
        }
        self.reset_pending();
    }

    fn reconnect(&mut self) -> Result<()> {
        self.close();
        self.open_stream()
    }
}

//! Connection Handler
//!
//! Handles individual client connections of the loopback server.

use std::io::{BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::time::Duration;

use bytes::BytesMut;

use crate::error::{HsError, Result};
use crate::memory::ServerConnection;
use crate::protocol::{encode_response, read_line};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Indexes opened by this client
    backend: ServerConnection,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, backend: ServerConnection) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            backend,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.reader.get_ref().set_read_timeout(Some(timeout))?;
        self.writer.get_ref().set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Answers request lines in order. Responses to a pipelined burst are
    /// flushed together once no further request is already buffered.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let mut line = Vec::new();
        let mut out = BytesMut::with_capacity(4096);

        loop {
            match read_line(&mut self.reader, &mut line) {
                Ok(()) => {}
                Err(HsError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::UnexpectedEof
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(HsError::Io(ref e))
                    if matches!(
                        e.kind(),
                        // Windows uses TimedOut instead of WouldBlock
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }

            tracing::trace!(
                "Received request from {}: {:?}",
                self.peer_addr,
                String::from_utf8_lossy(&line)
            );

            let response = self.backend.handle_line(&line);
            encode_response(&mut out, &response);

            if self.reader.buffer().is_empty() {
                if let Err(e) = self.send(&mut out) {
                    if let HsError::Io(ref io_err) = e {
                        if matches!(
                            io_err.kind(),
                            std::io::ErrorKind::ConnectionAborted
                                | std::io::ErrorKind::ConnectionReset
                                | std::io::ErrorKind::BrokenPipe
                        ) {
                            tracing::debug!(
                                "Client {} disconnected before responses could be sent: {}",
                                self.peer_addr,
                                e
                            );
                            return Ok(());
                        }
                    }
                    tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }
        }
    }

    /// Write and clear the pending responses
    fn send(&mut self, out: &mut BytesMut) -> Result<()> {
        self.writer.write_all(out)?;
        self.writer.flush()?;
        out.clear();
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

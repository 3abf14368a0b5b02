//! TCP Server
//!
//! Accepts connections and serves each on its own thread.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{HsError, Result};
use crate::memory::MemoryServer;

use super::Connection;

/// How often the accept loop checks the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Loopback server answering the wire protocol from a [`MemoryServer`]
pub struct Server {
    config: Config,
    backend: MemoryServer,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server with the given config and backend
    pub fn new(config: Config, backend: MemoryServer) -> Self {
        Self {
            config,
            backend,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the listener; port 0 picks a free port
    pub fn bind(&mut self, addr: impl ToSocketAddrs) -> Result<SocketAddr> {
        self.config.validate()?;
        if self.config.max_connections == 0 {
            return Err(HsError::Config("max_connections must be non-zero".to_string()));
        }

        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local = listener.local_addr()?;

        tracing::info!(
            "Listening on {} (backlog hint {}, max {} connections)",
            local,
            self.config.listen_backlog,
            self.config.max_connections
        );
        self.listener = Some(listener);
        Ok(local)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| HsError::Config("server is not bound".to_string()))?;

        while !self.shutdown.load(Ordering::Relaxed) {
            let (stream, peer) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };

            if self.active.load(Ordering::Acquire) >= self.config.max_connections {
                tracing::warn!("Rejecting {}: connection limit reached", peer);
                continue;
            }

            let mut connection = match self.prepare(stream) {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!("Dropping {}: connection setup failed: {}", peer, e);
                    continue;
                }
            };

            let slot = ActiveSlot::acquire(&self.active);
            thread::spawn(move || {
                let _slot = slot;
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
            });
        }

        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    fn prepare(&self, stream: TcpStream) -> Result<Connection> {
        // Accepted sockets inherit non-blocking mode on some platforms
        stream.set_nonblocking(false)?;

        let mut connection = Connection::new(stream, self.backend.connect())?;
        connection.set_timeout(self.config.timeout())?;
        Ok(connection)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Flag that stops the accept loop when set, usable from other threads
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// One counted connection; released on drop, including when the handler panics
struct ActiveSlot {
    active: Arc<AtomicUsize>,
}

impl ActiveSlot {
    fn acquire(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

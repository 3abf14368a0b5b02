//! Configuration for hsclient
//!
//! Centralized connection configuration with the protocol's customary defaults.

use std::time::Duration;

use crate::error::{HsError, Result};

/// Connection configuration shared by the TCP transport and the loopback server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint
    // -------------------------------------------------------------------------
    /// Server host name or address
    pub host: String,

    /// Server port (9998 is the read/write listener by convention)
    pub port: u16,

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// Connect, read and write timeout (seconds)
    pub timeout_secs: u64,

    // -------------------------------------------------------------------------
    // Listener
    // -------------------------------------------------------------------------
    /// Accept backlog hint; clients ignore it and the loopback server only
    /// reports it (std listeners use the OS default)
    pub listen_backlog: u32,

    /// Max concurrent connections served by the loopback server
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9998,
            timeout_secs: 600,
            listen_backlog: 256,
            max_connections: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the parameters before any socket is touched
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(HsError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(HsError::Config("port must be non-zero".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(HsError::Config("timeout must be at least one second".to_string()));
        }
        if self.listen_backlog == 0 {
            return Err(HsError::Config("listen_backlog must be non-zero".to_string()));
        }
        Ok(())
    }

    /// `host:port` form accepted by `ToSocketAddrs`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the I/O timeout (in seconds)
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Set the listen backlog
    pub fn listen_backlog(mut self, backlog: u32) -> Self {
        self.config.listen_backlog = backlog;
        self
    }

    /// Set the maximum number of concurrent server connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

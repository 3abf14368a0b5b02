//! Network Module
//!
//! Loopback TCP server that answers the wire protocol from a
//! [`crate::memory::MemoryServer`], for local development and end-to-end tests.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection
//! - Each connection scopes its own opened indexes

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;

//! # hsclient
//!
//! A pipelining client for the HandlerSocket key-indexed CRUD protocol:
//! - Direct index lookups, inserts, updates and deletes, no SQL parser
//! - Whole batches written in one send, responses drained in order
//! - Per-operation results with precise failure semantics
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Session                               │
//! │          (Connected | Faulted | Disconnected)                │
//! └───────┬──────────────────────┬──────────────────────────────┘
//!         │                      │
//!         ▼                      ▼
//!  ┌──────────────┐     ┌──────────────────┐     ┌─────────────┐
//!  │IndexRegistry │     │ OperationBuilder │────▶│  Pipeline   │
//!  │ (open alone) │     │   (validation)   │     │  Executor   │
//!  └──────┬───────┘     └──────────────────┘     └──────┬──────┘
//!         │                                             │
//!         ▼                                             ▼
//!  ┌─────────────────────────────────────────────────────────────┐
//!  │                Transport (TCP | in-memory)                   │
//!  └──────────────────────────────┬──────────────────────────────┘
//!                                 │ one response per request
//!                                 ▼
//!                         ┌──────────────┐
//!                         │ResultDecoder │
//!                         └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use hsclient::memory::MemoryServer;
//! use hsclient::protocol::fields;
//! use hsclient::transport::MemoryTransport;
//! use hsclient::Session;
//!
//! let server = MemoryServer::new();
//! server.create_table("db", "t", &["k", "v"], &["k"]).unwrap();
//!
//! let mut session = Session::new(MemoryTransport::connect(&server));
//! session.open_index(1, "db", "t", "PRIMARY", &["k", "v"]).unwrap();
//! session.insert(1, fields(["a", "1"])).unwrap();
//!
//! let found = session.find(1, "=", fields(["a"]), 1, 0).unwrap();
//! assert_eq!(found.rows, vec![fields(["a", "1"])]);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod operation;
pub mod index;
pub mod transport;
pub mod pipeline;
pub mod session;
pub mod pool;
pub mod memory;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HsError, Result};
pub use config::Config;
pub use operation::{Operation, OperationBuilder};
pub use protocol::{field, fields, Field, ResponseRecord, Row};
pub use session::{Session, SessionState};
pub use pool::SessionPool;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hsclient
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

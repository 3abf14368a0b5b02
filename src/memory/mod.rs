//! Memory Module
//!
//! An in-memory engine that answers HandlerSocket requests.
//!
//! ## Responsibilities
//! - Hold tables, their columns, and named indexes
//! - Track the indexes each connection opened
//! - Execute decoded requests and produce wire responses
//!
//! ## Data Structure Choice
//! Rows live in a `Vec` per table behind one `RwLock` for all tables:
//! - Lookups scan and sort by the index key, which is plenty for tests and demos
//! - One lock keeps every connection's view consistent

mod server;
mod table;

pub use server::{MemoryServer, ServerConnection};
pub use table::Table;

/// Name of the index every table has over its primary key
pub const PRIMARY_INDEX: &str = "PRIMARY";

// =============================================================================
// Server Error Messages
// =============================================================================

/// Unknown table, or unknown index on a known table
pub const ERR_OPEN_TABLE: &str = "open_table";

/// Opened field list names a column the table does not have
pub const ERR_FIELD: &str = "fld";

/// Request references an id that was never opened on this connection
pub const ERR_STMTNUM: &str = "stmtnum";

/// Unsupported comparison operator
pub const ERR_OP: &str = "op";

/// Key count is zero or exceeds the index columns
pub const ERR_KPNUM: &str = "kpnum";

/// Modifier values do not fit the opened fields
pub const ERR_MODOP: &str = "modop";

/// Duplicate primary key on insert
pub const ERR_DUP_KEY: &str = "121";

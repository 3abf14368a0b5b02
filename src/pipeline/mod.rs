//! Pipeline Module
//!
//! Batching and pipelining of operations over one connection.
//!
//! ## Wire Contract
//! - One response per request
//! - Responses arrive in request order, never interleaved
//!
//! ## Failure Rules
//! - Send failure: the batch collapses into one record carrying the error
//! - Receive failure: the batch ends with a record carrying the error
//! - Server rejection: the batch ends with the rejected operation's record;
//!   the connection remains usable
//!
//! Outcomes of operations that were sent but never reported are unknown: the
//! server may or may not have applied them.

mod decoder;
mod executor;

pub use decoder::ResultDecoder;
pub use executor::{PipelineExecutor, PipelineState};

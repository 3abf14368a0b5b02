//! Request definitions
//!
//! Represents the requests a client can put on the wire.

use crate::index::IndexHandle;
use crate::operation::Operation;

/// A request line
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Bind an index to a numeric id for the rest of the connection
    OpenIndex(IndexHandle),

    /// Generic execute: find, insert, or find-and-modify
    Execute(Operation),
}

impl From<IndexHandle> for Request {
    fn from(handle: IndexHandle) -> Self {
        Request::OpenIndex(handle)
    }
}

impl From<Operation> for Request {
    fn from(operation: Operation) -> Self {
        Request::Execute(operation)
    }
}

//! Index registry
//!
//! Bookkeeping of the index handles opened on one connection.

use std::collections::BTreeMap;

use crate::error::{HsError, Result};
use crate::transport::{receive_status, Transport};

use super::IndexHandle;

/// Index handles opened on one connection, keyed by id
#[derive(Debug, Default)]
pub struct IndexRegistry {
    handles: BTreeMap<u32, IndexHandle>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `handle` on `transport`
    ///
    /// The request is flushed on its own and its single response is drained
    /// before returning; it is never pipelined with other operations.
    ///
    /// - negative code: `HsError::Transport`, the connection is unusable
    /// - positive code: `HsError::Protocol`, the connection stays usable
    /// - zero: the handle is recorded, replacing any earlier one with that id
    pub fn open<T: Transport + ?Sized>(&mut self, transport: &mut T, handle: IndexHandle) -> Result<()> {
        transport.buffer_open_index(&handle);
        transport.flush_send()?;

        let header = receive_status(transport)?;
        if header.code != 0 {
            let message = transport.last_error_message();
            transport.release_response();
            tracing::debug!(
                "Open index {} ({}.{}.{}) rejected: {} {}",
                handle.id,
                handle.database,
                handle.table,
                handle.index_name,
                header.code,
                message
            );
            return Err(HsError::Protocol {
                code: header.code,
                message,
            });
        }
        transport.release_response();

        tracing::debug!(
            "Opened index {} on {}.{}.{} [{}]",
            handle.id,
            handle.database,
            handle.table,
            handle.index_name,
            handle.field_list()
        );
        self.handles.insert(handle.id, handle);
        Ok(())
    }

    /// Handle recorded for `id`
    pub fn get(&self, id: u32) -> Option<&IndexHandle> {
        self.handles.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in id order
    pub fn iter(&self) -> impl Iterator<Item = &IndexHandle> {
        self.handles.values()
    }

    /// Forget every handle (the connection was closed or replaced)
    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

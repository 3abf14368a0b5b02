//! Session Module
//!
//! The public connection object that coordinates all components.
//!
//! ## Responsibilities
//! - Own the transport, the index registry and the pipeline executor
//! - Guard every call on the connection state
//! - Build validated operations for the single-verb entry points
//! - Reconnect, resetting everything the old connection owned

use crate::config::Config;
use crate::error::{HsError, Result};
use crate::index::{IndexHandle, IndexRegistry};
use crate::operation::{Operation, OperationBuilder};
use crate::pipeline::PipelineExecutor;
use crate::protocol::{Field, ResponseRecord};
use crate::transport::{TcpTransport, Transport};

/// Connection state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Usable
    Connected,

    /// A transport failure happened; reconnect before reuse
    Faulted,

    /// Closed by the caller; reconnect before reuse
    Disconnected,
}

/// One connection and everything scoped to it
///
/// ## Concurrency
/// Every call that touches the wire takes `&mut self`: one batch at a time
/// per connection. Use one session per thread (see [`crate::pool`]).
pub struct Session<T: Transport> {
    transport: T,
    registry: IndexRegistry,
    executor: PipelineExecutor,
    closed: bool,
}

impl Session<TcpTransport> {
    /// Validate `config` and open a TCP session
    pub fn connect(config: &Config) -> Result<Self> {
        let transport = TcpTransport::connect(config)?;
        tracing::info!("Session connected to {}", transport.peer_addr());
        Ok(Self::new(transport))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already-connected transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            registry: IndexRegistry::new(),
            executor: PipelineExecutor::new(),
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Disconnected
        } else if self.executor.is_faulted() {
            SessionState::Faulted
        } else {
            SessionState::Connected
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        match self.state() {
            SessionState::Connected => Ok(()),
            SessionState::Faulted => Err(HsError::Faulted),
            SessionState::Disconnected => Err(HsError::NotConnected),
        }
    }

    // =========================================================================
    // Index Handles
    // =========================================================================

    /// Open an index under `id`
    ///
    /// Sent alone and answered before returning. A server rejection is
    /// `HsError::Protocol`; a connection failure is `HsError::Transport` and
    /// faults the session.
    pub fn open_index<S: AsRef<str>>(
        &mut self,
        id: i32,
        database: &str,
        table: &str,
        index_name: &str,
        fields: &[S],
    ) -> Result<()> {
        let handle = IndexHandle::new(id, database, table, index_name, fields)?;
        self.open_handle(handle)
    }

    /// Open a prepared handle
    pub fn open_handle(&mut self, handle: IndexHandle) -> Result<()> {
        self.ensure_connected()?;

        let result = self.registry.open(&mut self.transport, handle);
        if let Err(ref e) = result {
            if e.is_fatal() {
                tracing::warn!("Open index failed, session faulted: {}", e);
                self.executor.fault();
            }
        }
        result
    }

    /// Handles opened on the current connection
    pub fn indexes(&self) -> &IndexRegistry {
        &self.registry
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Look up rows; `limit` 0 means unbounded
    pub fn find(
        &mut self,
        index_id: i32,
        operator: &str,
        keys: Vec<Field>,
        limit: u32,
        skip: u32,
    ) -> Result<ResponseRecord> {
        let operation = OperationBuilder::find(index_id, operator, keys)
            .limit(limit)
            .skip(skip)
            .build()?;
        self.execute(operation)
    }

    /// Overwrite the opened fields of matched rows
    pub fn update(
        &mut self,
        index_id: i32,
        operator: &str,
        keys: Vec<Field>,
        limit: u32,
        skip: u32,
        values: Vec<Field>,
    ) -> Result<ResponseRecord> {
        let operation = OperationBuilder::update(index_id, operator, keys, values)
            .limit(limit)
            .skip(skip)
            .build()?;
        self.execute(operation)
    }

    /// Remove matched rows
    pub fn delete(
        &mut self,
        index_id: i32,
        operator: &str,
        keys: Vec<Field>,
        limit: u32,
        skip: u32,
    ) -> Result<ResponseRecord> {
        let operation = OperationBuilder::delete(index_id, operator, keys)
            .limit(limit)
            .skip(skip)
            .build()?;
        self.execute(operation)
    }

    /// Insert one row in the field order of the opened index
    pub fn insert(&mut self, index_id: i32, values: Vec<Field>) -> Result<ResponseRecord> {
        let operation = OperationBuilder::insert(index_id, values).build()?;
        self.execute(operation)
    }

    /// Run one operation; identical to a batch of one
    pub fn execute(&mut self, operation: Operation) -> Result<ResponseRecord> {
        let mut records = self.execute_batch(std::slice::from_ref(&operation))?;
        // A non-empty batch always yields at least one record
        Ok(records.swap_remove(0))
    }

    /// Pipeline a batch; see [`PipelineExecutor::run`] for the result shape
    ///
    /// `Err` only when the session is not usable to begin with.
    pub fn execute_batch(&mut self, operations: &[Operation]) -> Result<Vec<ResponseRecord>> {
        self.ensure_connected()?;
        self.executor.run(&mut self.transport, operations)
    }

    // =========================================================================
    // Connection Lifecycle
    // =========================================================================

    /// Close the connection; opened indexes are forgotten
    pub fn close(&mut self) {
        self.transport.close();
        self.registry.clear();
        self.closed = true;
        tracing::debug!("Session closed");
    }

    /// Re-establish the connection from any state
    ///
    /// Pending state is discarded and every index must be reopened.
    pub fn reconnect(&mut self) -> Result<()> {
        self.registry.clear();
        self.closed = false;

        match self.transport.reconnect() {
            Ok(()) => {
                self.executor.reset();
                tracing::info!("Session reconnected");
                Ok(())
            }
            Err(e) => {
                self.executor.fault();
                Err(e)
            }
        }
    }

    /// True when nothing is buffered or in flight
    pub fn is_stable_point(&self) -> bool {
        self.transport.is_stable_point()
    }

    pub fn last_error_code(&self) -> i32 {
        self.transport.last_error_code()
    }

    pub fn last_error_message(&self) -> String {
        self.transport.last_error_message()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

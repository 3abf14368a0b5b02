//! Pipeline executor
//!
//! Writes a whole batch before reading anything back, then drains exactly one
//! response per request, in request order.

use crate::error::{HsError, Result};
use crate::operation::Operation;
use crate::protocol::ResponseRecord;
use crate::transport::{receive_status, Transport};

use super::ResultDecoder;

/// Where the executor is within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Ready for the next batch
    Idle,

    /// Buffering requests; nothing sent yet
    Submitting,

    /// Reading responses for the sent batch
    Draining,

    /// The connection failed; only a reconnect clears this
    Faulted,
}

/// Runs batches over one transport
///
/// ## State Machine
/// ```text
///   Idle ──▶ Submitting ──▶ Draining ──▶ Idle
///               │              │
///               └──────┬───────┘
///                      ▼ (transport failure)
///                   Faulted ──(reset after reconnect)──▶ Idle
/// ```
#[derive(Debug)]
pub struct PipelineExecutor {
    state: PipelineState,
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_faulted(&self) -> bool {
        self.state == PipelineState::Faulted
    }

    /// Enter `Faulted` after a failure observed outside a batch
    pub fn fault(&mut self) {
        self.state = PipelineState::Faulted;
    }

    /// Back to `Idle`; only valid once the transport was re-established
    pub fn reset(&mut self) {
        self.state = PipelineState::Idle;
    }

    /// Run a batch
    ///
    /// Steps:
    /// 1. Buffer every operation (no I/O)
    /// 2. Flush once; on failure return one record carrying the transport error
    /// 3. Drain responses in order, stopping at the first failure
    ///
    /// The result has one record per operation only if every operation
    /// succeeded; otherwise it ends with the first failing one. After a
    /// server-side rejection the remaining in-flight responses are read and
    /// discarded so the connection is positioned for the next batch.
    ///
    /// Fails with `HsError::Faulted` if called while faulted.
    pub fn run<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        batch: &[Operation],
    ) -> Result<Vec<ResponseRecord>> {
        if self.is_faulted() {
            return Err(HsError::Faulted);
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        // Step 1: Submitting
        self.state = PipelineState::Submitting;
        for operation in batch {
            transport.buffer_execute(operation);
        }

        // Step 2: one send for the whole batch
        if let Err(e) = transport.flush_send() {
            tracing::warn!("Batch of {} failed to send: {}", batch.len(), e);
            self.state = PipelineState::Faulted;
            return Ok(vec![ResponseRecord::from_error(&e)]);
        }
        tracing::debug!("Submitted batch of {} operation(s)", batch.len());

        // Step 3: Draining
        self.state = PipelineState::Draining;
        let mut records = Vec::with_capacity(batch.len());

        for position in 0..batch.len() {
            let record = match ResultDecoder::decode(transport) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        "Transport failed while draining response {} of {}: {}",
                        position + 1,
                        batch.len(),
                        e
                    );
                    records.push(ResponseRecord::from_error(&e));
                    self.state = PipelineState::Faulted;
                    return Ok(records);
                }
            };

            transport.release_response();

            if !record.is_success() {
                tracing::debug!(
                    "Operation {} of {} rejected: {} {}",
                    position + 1,
                    batch.len(),
                    record.error_code,
                    record.error_message.as_deref().unwrap_or("")
                );
                records.push(record);
                self.discard(transport, batch.len() - position - 1);
                return Ok(records);
            }

            records.push(record);
        }

        self.state = PipelineState::Idle;
        Ok(records)
    }

    /// Read and drop `count` responses nobody will see
    fn discard<T: Transport + ?Sized>(&mut self, transport: &mut T, count: usize) {
        for _ in 0..count {
            match receive_status(transport) {
                Ok(_) => transport.release_response(),
                Err(e) => {
                    tracing::warn!("Transport failed while discarding responses: {}", e);
                    self.state = PipelineState::Faulted;
                    return;
                }
            }
        }

        if count > 0 {
            tracing::debug!("Discarded {} response(s) after a rejected operation", count);
        }
        self.state = PipelineState::Idle;
    }
}

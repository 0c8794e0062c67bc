use orchestrate_core::{Error, OperationRequest, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::transport::{Transport, TransportOutcome};

/// How the dispatcher is currently issuing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One request at a time, each awaited by the caller
    Serial,
    /// Requests registered in a batch, resolved together
    Batched,
}

/// Hands built requests to the transport and tracks the execution mode
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    batching: AtomicBool,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            batching: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        if self.batching.load(Ordering::SeqCst) {
            ExecutionMode::Batched
        } else {
            ExecutionMode::Serial
        }
    }

    pub fn supports_batching(&self) -> bool {
        self.transport.supports_batching()
    }

    /// Issue one request. No retries.
    pub async fn execute(&self, request: &OperationRequest) -> Result<TransportOutcome> {
        let mode = self.mode();
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            ?mode,
            "Dispatching request"
        );

        let outcome = self.transport.execute(request, mode).await?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status = outcome.status,
            "Request completed"
        );
        Ok(outcome)
    }

    /// Switch to batched mode until the returned guard is dropped.
    ///
    /// Fails if a batch is already running; the mode is not reentrant.
    pub fn enter_batch(&self) -> Result<BatchGuard<'_>> {
        self.batching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::Batch("a batch is already running on this client".to_string()))?;
        Ok(BatchGuard { dispatcher: self })
    }
}

/// Restores serial mode when dropped, on every exit path
pub struct BatchGuard<'a> {
    dispatcher: &'a Dispatcher,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.batching.store(false, Ordering::SeqCst);
    }
}

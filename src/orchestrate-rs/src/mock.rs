//! In-memory transport for tests: records requests, replays canned outcomes.

use async_trait::async_trait;
use orchestrate_core::{Method, OperationRequest, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::dispatch::ExecutionMode;
use crate::transport::{Transport, TransportOutcome};

pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), TransportOutcome>>,
    calls: Mutex<Vec<(OperationRequest, ExecutionMode)>>,
    batching: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            batching: true,
        }
    }

    pub fn without_batching() -> Self {
        Self {
            batching: false,
            ..Self::new()
        }
    }

    /// Answer `method path` (path without query) with `outcome`
    pub fn on(&self, method: Method, path: &str, outcome: TransportOutcome) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), outcome);
    }

    pub fn requests(&self) -> Vec<OperationRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn modes(&self) -> Vec<ExecutionMode> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, mode)| *mode)
            .collect()
    }

    pub fn last_request(&self) -> OperationRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        request: &OperationRequest,
        mode: ExecutionMode,
    ) -> Result<TransportOutcome> {
        self.calls.lock().unwrap().push((request.clone(), mode));
        let routed = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method, request.path.clone()))
            .cloned();
        Ok(routed.unwrap_or_else(|| TransportOutcome::new(200).with_body("{}")))
    }

    fn supports_batching(&self) -> bool {
        self.batching
    }
}

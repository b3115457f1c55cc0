//! Deadline enforcement for requests.
//!
//! Fails the dispatch with `MediatorError::Timeout` when the inner chain does
//! not settle in time. The inner future is dropped at the deadline.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::{
    CancellationToken, ErasedResponse, MediatorError, Next, OpenBehavior, RequestEnvelope,
};

/// Open behavior that bounds every request by a fixed deadline.
#[derive(Debug, Clone)]
pub struct TimeoutBehavior {
    timeout_ms: u64,
}

impl TimeoutBehavior {
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }

    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }
}

#[async_trait]
impl OpenBehavior for TimeoutBehavior {
    async fn handle(
        &self,
        _request: RequestEnvelope<'_>,
        next: Next<'_, ErasedResponse>,
        _cancellation: &CancellationToken,
    ) -> anyhow::Result<ErasedResponse> {
        let timeout_ms = self.timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), next.run()).await {
            Ok(result) => Ok(result?),
            Err(_elapsed) => Err(MediatorError::Timeout { timeout_ms }.into()),
        }
    }
}

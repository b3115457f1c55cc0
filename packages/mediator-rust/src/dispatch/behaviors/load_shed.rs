//! Load shedding for requests.
//!
//! Rejects requests once `max_concurrent` dispatches are in flight instead of
//! queueing them. The rejection surfaces as an `OperationFault` whose source
//! is [`Overloaded`].

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{CancellationToken, ErasedResponse, Next, OpenBehavior, RequestEnvelope};
use tokio::sync::Semaphore;

/// Raised when every permit of a [`ConcurrencyLimitBehavior`] is taken.
#[derive(Debug, thiserror::Error)]
#[error("{request_type} rejected: {limit} requests already in flight")]
pub struct Overloaded {
    pub request_type: &'static str,
    pub limit: u32,
}

/// Open behavior limiting in-flight requests via a semaphore.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimitBehavior {
    semaphore: Arc<Semaphore>,
    limit: u32,
}

impl ConcurrencyLimitBehavior {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
            limit: max_concurrent,
        }
    }

    /// Permits not currently held by an in-flight request.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[async_trait]
impl OpenBehavior for ConcurrencyLimitBehavior {
    async fn handle(
        &self,
        request: RequestEnvelope<'_>,
        next: Next<'_, ErasedResponse>,
        _cancellation: &CancellationToken,
    ) -> anyhow::Result<ErasedResponse> {
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            return Err(Overloaded {
                request_type: request.type_name(),
                limit: self.limit,
            }
            .into());
        };

        let result = next.run().await;
        drop(permit);
        Ok(result?)
    }
}

//! Notification fan-out.
//!
//! Both strategies are best-effort broadcasts: a failing handler never stops
//! the others. A handler reporting `Cancelled` is the exception and returns as
//! soon as it is observed. A `Timeout` from one handler is an ordinary failure
//! here. Otherwise the first observed failure is returned once every handler
//! has settled and any later failures are logged.

use std::sync::Arc;

use courier_core::{message_name, CancellationToken, MediatorError, Notification, NotificationHandler};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::warn;

use super::pipeline::invoke_guarded;

/// Poll every handler concurrently on the current task.
pub(crate) async fn publish_concurrent<N: Notification>(
    notification: &N,
    handlers: &[Arc<dyn NotificationHandler<N>>],
    cancellation: &CancellationToken,
) -> Result<(), MediatorError> {
    let mut pending: FuturesUnordered<_> = handlers
        .iter()
        .map(|handler| invoke_guarded(handler.name(), handler.handle(notification, cancellation)))
        .collect();

    let mut failures = FailureCollector::<N>::new();
    while let Some(outcome) = pending.next().await {
        if let Err(error) = outcome {
            if error.is_token_cancelled() {
                return Err(error);
            }
            failures.record(error);
        }
    }
    failures.finish()
}

/// Await handlers one at a time in registration order.
pub(crate) async fn publish_sequential<N: Notification>(
    notification: &N,
    handlers: &[Arc<dyn NotificationHandler<N>>],
    cancellation: &CancellationToken,
) -> Result<(), MediatorError> {
    let mut failures = FailureCollector::<N>::new();
    for handler in handlers {
        let outcome =
            invoke_guarded(handler.name(), handler.handle(notification, cancellation)).await;
        if let Err(error) = outcome {
            if error.is_token_cancelled() {
                return Err(error);
            }
            failures.record(error);
        }
    }
    failures.finish()
}

/// Keeps the first failure, logs the rest.
struct FailureCollector<N> {
    first: Option<MediatorError>,
    suppressed: usize,
    _notification: std::marker::PhantomData<fn(N)>,
}

impl<N: Notification> FailureCollector<N> {
    fn new() -> Self {
        Self {
            first: None,
            suppressed: 0,
            _notification: std::marker::PhantomData,
        }
    }

    fn record(&mut self, error: MediatorError) {
        if self.first.is_none() {
            self.first = Some(error);
        } else {
            self.suppressed += 1;
            warn!(
                notification_type = message_name::<N>(),
                error = %error,
                "additional notification handler failure"
            );
        }
    }

    fn finish(self) -> Result<(), MediatorError> {
        match self.first {
            None => Ok(()),
            Some(error) => {
                if self.suppressed > 0 {
                    warn!(
                        notification_type = message_name::<N>(),
                        suppressed = self.suppressed,
                        "surfacing first notification handler failure only"
                    );
                }
                Err(error)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

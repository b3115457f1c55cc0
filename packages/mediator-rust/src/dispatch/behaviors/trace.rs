//! Dispatch instrumentation.
//!
//! Records request duration and outcome using `tracing` spans.

use std::time::Instant;

use async_trait::async_trait;
use courier_core::{CancellationToken, ErasedResponse, Next, OpenBehavior, RequestEnvelope};
use tracing::{info_span, Instrument};

/// Open behavior that wraps each dispatch in a `dispatch` span.
///
/// The span carries `request_type`, and `duration_ms` plus `outcome`
/// (`ok`, `cancelled` or `error`) are recorded once the inner chain settles.
#[derive(Debug, Clone, Default)]
pub struct TracingBehavior;

#[async_trait]
impl OpenBehavior for TracingBehavior {
    async fn handle(
        &self,
        request: RequestEnvelope<'_>,
        next: Next<'_, ErasedResponse>,
        _cancellation: &CancellationToken,
    ) -> anyhow::Result<ErasedResponse> {
        let request_type = request.type_name();
        let span = info_span!(
            "dispatch",
            request_type,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = next.run().await;

            let outcome = match &result {
                Ok(_) => "ok",
                Err(error) if error.is_cancellation() => "cancelled",
                Err(_) => "error",
            };

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);

            match &result {
                Err(error) if outcome == "error" => tracing::warn!(
                    request_type,
                    duration_ms,
                    error = %error,
                    "dispatch failed"
                ),
                _ => tracing::debug!(request_type, duration_ms, outcome, "dispatch complete"),
            }

            Ok(result?)
        }
        .instrument(span)
        .await
    }
}

//! Pipeline composition: folds resolved behaviors around the terminal handler call.
//!
//! Behaviors arrive in registration order. Folding left-to-right wraps each one
//! around everything registered before it, so the last-registered behavior
//! ends up outermost and runs first:
//!
//! ```text
//! [B1, B2, B3] + H  =>  B3(next = B2(next = B1(next = H)))
//! ```
//!
//! The chain closes over the request and token of one dispatch and is rebuilt
//! on every call.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use courier_core::{
    CancellationToken, ErasedResponse, MediatorError, Next, Request, RequestEnvelope,
    RequestHandler, RequestPostProcessor, RequestPreProcessor,
};
use futures_util::FutureExt;

use super::registry::PipelineStage;

/// Await a handler, behavior or processor future and normalize its outcome.
///
/// Errors go through [`MediatorError::from_fault`]; a panic becomes an
/// `OperationFault` naming `origin`.
pub(crate) async fn invoke_guarded<T, F>(origin: &'static str, future: F) -> Result<T, MediatorError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(MediatorError::from_fault(origin, error)),
        Err(payload) => Err(MediatorError::OperationFault {
            origin,
            source: anyhow::anyhow!("panicked: {}", panic_message(&*payload)),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Innermost continuation: pre-processors, the handler, then post-processors.
pub(crate) fn terminal<'a, R: Request>(
    request: &'a R,
    handler: Arc<dyn RequestHandler<R>>,
    pre_processors: Vec<Arc<dyn RequestPreProcessor<R>>>,
    post_processors: Vec<Arc<dyn RequestPostProcessor<R>>>,
    cancellation: &'a CancellationToken,
) -> Next<'a, R::Response> {
    Next::new(async move {
        for processor in &pre_processors {
            invoke_guarded(processor.name(), processor.process(request, cancellation)).await?;
        }

        let response =
            invoke_guarded(handler.name(), handler.handle(request, cancellation)).await?;

        for processor in &post_processors {
            invoke_guarded(
                processor.name(),
                processor.process(request, &response, cancellation),
            )
            .await?;
        }

        Ok(response)
    })
}

/// Wrap `terminal` in `stages` so the last stage is the outermost link.
pub(crate) fn compose<'a, R: Request>(
    request: &'a R,
    stages: Vec<PipelineStage<R>>,
    terminal: Next<'a, R::Response>,
    cancellation: &'a CancellationToken,
) -> Next<'a, R::Response> {
    stages
        .into_iter()
        .fold(terminal, |next, stage| wrap(request, stage, next, cancellation))
}

fn wrap<'a, R: Request>(
    request: &'a R,
    stage: PipelineStage<R>,
    next: Next<'a, R::Response>,
    cancellation: &'a CancellationToken,
) -> Next<'a, R::Response> {
    match stage {
        PipelineStage::Typed(behavior) => Next::new(async move {
            invoke_guarded(behavior.name(), behavior.handle(request, next, cancellation)).await
        }),
        PipelineStage::Open(behavior) => Next::new(async move {
            let origin = behavior.name();
            let erased_next = Next::new(async move { next.run().await.map(ErasedResponse::new) });
            let erased = invoke_guarded(
                origin,
                behavior.handle(RequestEnvelope::of(request), erased_next, cancellation),
            )
            .await?;
            erased.into_typed::<R::Response>(origin)
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use courier_core::{OpenBehavior, PipelineBehavior};
    use parking_lot::Mutex;

    use super::*;

    struct Echo(u32);

    impl Request for Echo {
        type Response = u32;
    }

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler<Echo> for EchoHandler {
        async fn handle(&self, request: &Echo, _cancellation: &CancellationToken) -> anyhow::Result<u32> {
            Ok(request.0)
        }
    }

    /// Adds `delta` to the response on the way out and logs entry/exit.
    struct Adder {
        label: &'static str,
        delta: u32,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PipelineBehavior<Echo> for Adder {
        async fn handle(
            &self,
            _request: &Echo,
            next: Next<'_, u32>,
            _cancellation: &CancellationToken,
        ) -> anyhow::Result<u32> {
            self.log.lock().push(format!("enter:{}", self.label));
            let response = next.run().await?;
            self.log.lock().push(format!("exit:{}", self.label));
            Ok(response + self.delta)
        }
    }

    struct Blank;

    #[async_trait]
    impl OpenBehavior for Blank {
        async fn handle(
            &self,
            _request: RequestEnvelope<'_>,
            _next: Next<'_, ErasedResponse>,
            _cancellation: &CancellationToken,
        ) -> anyhow::Result<ErasedResponse> {
            Ok(ErasedResponse::none())
        }
    }

    fn terminal_for<'a>(request: &'a Echo, token: &'a CancellationToken) -> Next<'a, u32> {
        terminal(request, Arc::new(EchoHandler), Vec::new(), Vec::new(), token)
    }

    #[tokio::test]
    async fn empty_pipeline_returns_handler_result() {
        let token = CancellationToken::new();
        let request = Echo(9);
        let chain = compose(&request, Vec::new(), terminal_for(&request, &token), &token);
        assert_eq!(chain.run().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn last_registered_stage_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages = vec![
            PipelineStage::Typed(Arc::new(Adder { label: "B1", delta: 1, log: log.clone() })
                as Arc<dyn PipelineBehavior<Echo>>),
            PipelineStage::Typed(Arc::new(Adder { label: "B2", delta: 10, log: log.clone() })
                as Arc<dyn PipelineBehavior<Echo>>),
        ];

        let token = CancellationToken::new();
        let request = Echo(100);
        let chain = compose(&request, stages, terminal_for(&request, &token), &token);
        assert_eq!(chain.run().await.unwrap(), 111);
        assert_eq!(
            *log.lock(),
            vec!["enter:B2", "enter:B1", "exit:B1", "exit:B2"]
        );
    }

    #[tokio::test]
    async fn open_stage_returning_none_is_null_result() {
        let token = CancellationToken::new();
        let request = Echo(1);
        let stages = vec![PipelineStage::Open(Arc::new(Blank) as Arc<dyn OpenBehavior>)];
        let chain = compose(&request, stages, terminal_for(&request, &token), &token);
        let err = chain.run().await.unwrap_err();
        assert!(matches!(err, MediatorError::NullResult { origin: "Blank", .. }));
    }

    #[tokio::test]
    async fn guarded_panic_becomes_operation_fault() {
        async fn explode() -> anyhow::Result<()> {
            panic!("kaboom")
        }

        let result = invoke_guarded("Exploder", explode()).await;
        match result.unwrap_err() {
            MediatorError::OperationFault { origin, source } => {
                assert_eq!(origin, "Exploder");
                assert!(source.to_string().contains("kaboom"));
            }
            other => panic!("expected OperationFault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn guarded_error_is_wrapped_with_origin() {
        let result: Result<(), _> =
            invoke_guarded("Saver", async { Err(anyhow::anyhow!("constraint violated")) }).await;
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Saver failed: constraint violated");
    }
}

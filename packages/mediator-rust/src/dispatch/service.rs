//! `tower::Service` adapter over [`Mediator::send`].

use std::fmt;
use std::marker::PhantomData;
use std::task::{Context, Poll};

use courier_core::{BoxFuture, CancellationToken, MediatorError, Request};
use tower::Service;

use super::mediator::Mediator;
use super::registry::{BehaviorResolver, HandlerRegistry, HandlerResolver};

/// A mediator bound to one request type, usable wherever a `tower::Service`
/// is expected.
///
/// Every call dispatches with a child of the service's cancellation token, so
/// cancelling that token cancels all calls made through the service.
pub struct MediatorService<R, H = HandlerRegistry> {
    mediator: Mediator<H>,
    cancellation: CancellationToken,
    _request: PhantomData<fn(R)>,
}

impl<R, H> Clone for MediatorService<R, H> {
    fn clone(&self) -> Self {
        Self {
            mediator: self.mediator.clone(),
            cancellation: self.cancellation.clone(),
            _request: PhantomData,
        }
    }
}

impl<R, H> fmt::Debug for MediatorService<R, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorService")
            .field("request_type", &courier_core::message_name::<R>())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<H> Mediator<H>
where
    H: HandlerResolver + BehaviorResolver + 'static,
{
    /// Bind this mediator to request type `R` as a `tower::Service`.
    #[must_use]
    pub fn into_service<R: Request>(self, cancellation: CancellationToken) -> MediatorService<R, H> {
        MediatorService {
            mediator: self,
            cancellation,
            _request: PhantomData,
        }
    }
}

impl<R, H> Service<R> for MediatorService<R, H>
where
    R: Request,
    H: HandlerResolver + BehaviorResolver + 'static,
{
    type Response = R::Response;
    type Error = MediatorError;
    type Future = BoxFuture<'static, Result<R::Response, MediatorError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Load shedding and deadlines live in the behavior pipeline.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: R) -> Self::Future {
        let mediator = self.mediator.clone();
        let cancellation = self.cancellation.child_token();
        Box::pin(async move { mediator.send(request, &cancellation).await })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

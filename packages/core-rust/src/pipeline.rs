//! Pipeline behavior contracts and the continuation passed between links.
//!
//! A behavior receives the request, a [`Next`] continuation standing for "the
//! rest of the chain", and the dispatch's cancellation token. Awaiting
//! [`Next::run`] invokes the next behavior or, at the end of the chain, the
//! handler. Not awaiting it short-circuits the chain.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::error::MediatorError;
use crate::message::{message_name, Request};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// The remainder of the chain, consumed at most once.
///
/// Nothing inside runs until [`run`](Self::run) is awaited.
pub struct Next<'a, T> {
    inner: BoxFuture<'a, Result<T, MediatorError>>,
}

impl<'a, T> Next<'a, T> {
    /// Wrap a lazily evaluated future as a continuation.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, MediatorError>> + Send + 'a,
    {
        Self {
            inner: Box::pin(future),
        }
    }

    /// Invoke the rest of the chain.
    ///
    /// # Errors
    ///
    /// Returns whatever the inner behaviors or the handler fail with, already
    /// normalized into [`MediatorError`].
    pub async fn run(self) -> Result<T, MediatorError> {
        self.inner.await
    }
}

impl<T> fmt::Debug for Next<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PipelineBehavior
// ---------------------------------------------------------------------------

/// Cross-cutting wrapper around the handler for one request type.
///
/// Implement it generically (`impl<R: Request> PipelineBehavior<R> for X`) and
/// register it per request type, or implement [`OpenBehavior`] to apply to
/// every request type at once.
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        next: Next<'_, R::Response>,
        cancellation: &CancellationToken,
    ) -> anyhow::Result<R::Response>;

    /// Name reported in faults and logs. Defaults to the implementing type.
    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// OpenBehavior
// ---------------------------------------------------------------------------

/// Behavior registered once for the open `(request, response)` shape.
///
/// It sees the request through a [`RequestEnvelope`] and the response as an
/// [`ErasedResponse`]. Returning [`ErasedResponse::none`] is reported as
/// [`MediatorError::NullResult`].
#[async_trait]
pub trait OpenBehavior: Send + Sync {
    async fn handle(
        &self,
        request: RequestEnvelope<'_>,
        next: Next<'_, ErasedResponse>,
        cancellation: &CancellationToken,
    ) -> anyhow::Result<ErasedResponse>;

    /// Name reported in faults and logs. Defaults to the implementing type.
    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

/// Borrowed, type-erased view of the request being dispatched.
#[derive(Clone, Copy)]
pub struct RequestEnvelope<'a> {
    type_name: &'static str,
    request: &'a (dyn Any + Send + Sync),
}

impl<'a> RequestEnvelope<'a> {
    /// Erase a typed request.
    pub fn of<R: Request>(request: &'a R) -> Self {
        Self {
            type_name: message_name::<R>(),
            request,
        }
    }

    /// Short name of the concrete request type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the request as `T` if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        self.request.downcast_ref::<T>()
    }

    /// Returns `true` if the concrete request type is `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.request.is::<T>()
    }
}

impl fmt::Debug for RequestEnvelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Owned, type-erased response flowing through open behaviors.
pub struct ErasedResponse(Option<Box<dyn Any + Send>>);

impl ErasedResponse {
    /// Erase a typed response.
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    /// The absent response.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the response as `T` if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }

    /// Mutably borrow the response as `T` if that is its concrete type.
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.as_mut().and_then(|value| value.downcast_mut::<T>())
    }

    /// Recover the typed response produced for a link named `origin`.
    ///
    /// # Errors
    ///
    /// - `MediatorError::NullResult` if the response is absent.
    /// - `MediatorError::OperationFault` if it holds a type other than `T`.
    pub fn into_typed<T: 'static>(self, origin: &'static str) -> Result<T, MediatorError> {
        let Some(value) = self.0 else {
            return Err(MediatorError::NullResult {
                origin,
                response_type: message_name::<T>(),
            });
        };
        value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            MediatorError::OperationFault {
                origin,
                source: anyhow::anyhow!(
                    "returned a response that is not a {}",
                    message_name::<T>()
                ),
            }
        })
    }
}

impl fmt::Debug for ErasedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErasedResponse")
            .field(&if self.is_none() { "none" } else { "some" })
            .finish()
    }
}

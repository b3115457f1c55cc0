//! The dispatch engine exposed to callers.

use std::sync::Arc;

use courier_core::{
    message_name, CancellationExt, CancellationToken, Command, MediatorError, Notification,
    Request,
};
use tracing::{debug, trace};

use super::config::{MediatorConfig, PublishStrategy};
use super::pipeline::{compose, invoke_guarded, terminal};
use super::publish::{publish_concurrent, publish_sequential};
use super::registry::{BehaviorResolver, HandlerRegistry, HandlerResolver};

/// Routes requests, commands and notifications to their handlers.
///
/// Cheap to clone: the resolver and configuration are shared.
///
/// - [`send`](Self::send): one handler, wrapped by the behavior pipeline.
/// - [`send_command`](Self::send_command): one handler, no pipeline.
/// - [`publish`](Self::publish): every handler of the notification type.
pub struct Mediator<H = HandlerRegistry> {
    resolver: Arc<H>,
    config: Arc<MediatorConfig>,
}

impl<H> Clone for Mediator<H> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H> Mediator<H>
where
    H: HandlerResolver + BehaviorResolver + 'static,
{
    /// Create a mediator over `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<H>, config: MediatorConfig) -> Self {
        Self {
            resolver,
            config: Arc::new(config),
        }
    }

    /// Create a mediator with `MediatorConfig::default()`.
    #[must_use]
    pub fn with_defaults(resolver: Arc<H>) -> Self {
        Self::new(resolver, MediatorConfig::default())
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<H> {
        &self.resolver
    }

    #[must_use]
    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    fn check_entry(&self, cancellation: &CancellationToken) -> Result<(), MediatorError> {
        if self.config.reject_cancelled_on_entry {
            cancellation.ensure_active()?;
        }
        Ok(())
    }

    /// Dispatch `request` to its handler through the behavior pipeline.
    ///
    /// # Errors
    ///
    /// - `HandlerNotFound` if no handler is registered for `R`.
    /// - `InvalidArgument` if the registry entry for `R` has the wrong shape.
    /// - `OperationFault` if a handler, behavior or processor fails or panics.
    /// - `NullResult` if an open behavior produces no response.
    /// - `Cancelled` / `Timeout` propagated unchanged from any link.
    pub async fn send<R: Request>(
        &self,
        request: R,
        cancellation: &CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let request_type = message_name::<R>();
        self.check_entry(cancellation)?;

        let Some(handler) = self.resolver.request_handler::<R>()? else {
            debug!(request_type, "no request handler registered");
            return Err(MediatorError::HandlerNotFound { request_type });
        };

        let stages = self.resolver.behaviors::<R>()?;
        if stages.is_empty() {
            trace!(request_type, "no pipeline behaviors registered");
        }
        let pre_processors = self.resolver.pre_processors::<R>()?;
        let post_processors = self.resolver.post_processors::<R>()?;

        let innermost = terminal(
            &request,
            handler,
            pre_processors,
            post_processors,
            cancellation,
        );
        compose(&request, stages, innermost, cancellation).run().await
    }

    /// Dispatch `command` directly to its handler. Behaviors are not consulted.
    ///
    /// # Errors
    ///
    /// - `HandlerNotFound` if no handler is registered for `C`.
    /// - `InvalidArgument` if the registry entry for `C` has the wrong shape.
    /// - `OperationFault` if the handler fails or panics.
    /// - `Cancelled` / `Timeout` propagated unchanged from the handler.
    pub async fn send_command<C: Command>(
        &self,
        command: C,
        cancellation: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let command_type = message_name::<C>();
        self.check_entry(cancellation)?;

        let Some(handler) = self.resolver.command_handler::<C>()? else {
            debug!(command_type, "no command handler registered");
            return Err(MediatorError::HandlerNotFound {
                request_type: command_type,
            });
        };

        invoke_guarded(handler.name(), handler.handle(&command, cancellation)).await
    }

    /// Deliver `notification` to every registered handler.
    ///
    /// Zero handlers is a no-op.
    ///
    /// # Errors
    ///
    /// - `Cancelled` as soon as any handler reports it.
    /// - Otherwise the first observed handler failure (a handler's own
    ///   `Timeout` included), after all handlers settle.
    /// - `InvalidArgument` if a registry entry for `N` has the wrong shape.
    pub async fn publish<N: Notification>(
        &self,
        notification: N,
        cancellation: &CancellationToken,
    ) -> Result<(), MediatorError> {
        let notification_type = message_name::<N>();
        self.check_entry(cancellation)?;

        let handlers = self.resolver.notification_handlers::<N>()?;
        if handlers.is_empty() {
            trace!(notification_type, "no notification handlers registered");
            return Ok(());
        }

        debug!(
            notification_type,
            handlers = handlers.len(),
            strategy = ?self.config.publish_strategy,
            "publishing notification"
        );
        match self.config.publish_strategy {
            PublishStrategy::Concurrent => {
                publish_concurrent(&notification, &handlers, cancellation).await
            }
            PublishStrategy::Sequential => {
                publish_sequential(&notification, &handlers, cancellation).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

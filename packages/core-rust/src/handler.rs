use async_trait::async_trait;

use crate::cancel::CancellationToken;
use crate::message::{message_name, Command, Notification, Request};

/// Handles a single request type. Exactly one is registered per request type.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    /// Produce the response for `request`.
    async fn handle(
        &self,
        request: &R,
        cancellation: &CancellationToken,
    ) -> anyhow::Result<R::Response>;

    /// Name reported in faults and logs. Defaults to the implementing type.
    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

/// Handles a single command type. Exactly one is registered per command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Execute `command`.
    async fn handle(&self, command: &C, cancellation: &CancellationToken) -> anyhow::Result<()>;

    /// Name reported in faults and logs. Defaults to the implementing type.
    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

/// One of possibly many handlers reacting to a notification type.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    /// React to `notification`.
    async fn handle(
        &self,
        notification: &N,
        cancellation: &CancellationToken,
    ) -> anyhow::Result<()>;

    /// Name reported in faults and logs. Defaults to the implementing type.
    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

/// Runs before the request handler, after every pipeline behavior.
#[async_trait]
pub trait RequestPreProcessor<R: Request>: Send + Sync {
    async fn process(&self, request: &R, cancellation: &CancellationToken) -> anyhow::Result<()>;

    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

/// Runs after a successful request handler call, before any behavior sees the
/// response.
#[async_trait]
pub trait RequestPostProcessor<R: Request>: Send + Sync {
    async fn process(
        &self,
        request: &R,
        response: &R::Response,
        cancellation: &CancellationToken,
    ) -> anyhow::Result<()>;

    fn name(&self) -> &'static str {
        message_name::<Self>()
    }
}

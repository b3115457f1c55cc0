//! Courier mediator: in-process dispatch of requests, commands and notifications
//! through a composable behavior pipeline.

pub mod dispatch;
pub mod telemetry;

pub use courier_core::{
    message_name, CancellationExt, CancellationToken, Command, CommandHandler, ErasedResponse,
    MediatorError, Next, Notification, NotificationHandler, OpenBehavior, PipelineBehavior,
    Request, RequestEnvelope, RequestHandler, RequestPostProcessor, RequestPreProcessor,
};
pub use dispatch::{
    register_standard_behaviors, HandlerRegistry, Mediator, MediatorConfig, MediatorService,
    PublishStrategy,
};
pub use telemetry::{init_tracing, LogFormat};

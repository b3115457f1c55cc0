//! In-process request dispatch.
//!
//! This module implements the mediator and everything it resolves:
//!
//! 1. **Registration** (`registry`): `TypeId`-keyed handler, behavior and processor tables
//! 2. **Composition** (`pipeline`): Folds behaviors around the handler call
//! 3. **Fan-out** (`publish`): Concurrent or sequential notification delivery
//! 4. **Dispatch** (`mediator`): `send`, `send_command` and `publish`
//! 5. **Behaviors** (`behaviors`): Built-in tracing, timeout and load-shedding
//! 6. **Tower adapter** (`service`): A mediator bound to one request type

pub mod behaviors;
pub mod config;
pub mod mediator;
mod pipeline;
mod publish;
pub mod registry;
pub mod service;

// Re-export key types for convenient access.
pub use behaviors::{
    register_standard_behaviors, ConcurrencyLimitBehavior, Overloaded, TimeoutBehavior,
    TracingBehavior,
};
pub use config::{MediatorConfig, PublishStrategy};
pub use mediator::Mediator;
pub use registry::{BehaviorResolver, HandlerRegistry, HandlerResolver, PipelineStage};
pub use service::MediatorService;

//! Built-in open behaviors.
//!
//! - [`trace`]: Dispatch timing and outcome via `tracing` spans
//! - [`timeout`]: Per-request deadline enforcement
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`stack`]: Registers all of the above from `MediatorConfig`

pub mod load_shed;
pub mod stack;
pub mod timeout;
pub mod trace;

pub use load_shed::{ConcurrencyLimitBehavior, Overloaded};
pub use stack::register_standard_behaviors;
pub use timeout::TimeoutBehavior;
pub use trace::TracingBehavior;

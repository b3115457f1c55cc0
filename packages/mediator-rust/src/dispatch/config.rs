/// How `publish` drives the handlers of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishStrategy {
    /// Poll every handler concurrently on the caller's task.
    #[default]
    Concurrent,
    /// Await handlers one at a time in registration order.
    Sequential,
}

/// Mediator-level configuration.
///
/// Controls publish fan-out, entry-time cancellation checks and the settings
/// consumed by the standard behavior stack.
#[derive(Debug, Clone)]
pub struct MediatorConfig {
    /// Strategy used by `publish`.
    pub publish_strategy: PublishStrategy,
    /// Fail with `Cancelled` before resolving anything when the token is
    /// already triggered. When `false` the token is only delivered.
    pub reject_cancelled_on_entry: bool,
    /// Deadline applied by `TimeoutBehavior` in the standard stack, in
    /// milliseconds. `None` leaves requests unbounded.
    pub default_timeout_ms: Option<u64>,
    /// Permits for `ConcurrencyLimitBehavior` in the standard stack. `None`
    /// disables load shedding.
    pub max_concurrent_requests: Option<u32>,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            publish_strategy: PublishStrategy::Concurrent,
            reject_cancelled_on_entry: false,
            default_timeout_ms: Some(30_000),
            max_concurrent_requests: None,
        }
    }
}

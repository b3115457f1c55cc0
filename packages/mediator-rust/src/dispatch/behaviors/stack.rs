//! Standard behavior stack: registers the built-in behaviors from `MediatorConfig`.

use tracing::debug;

use super::load_shed::ConcurrencyLimitBehavior;
use super::timeout::TimeoutBehavior;
use super::trace::TracingBehavior;
use crate::dispatch::config::MediatorConfig;
use crate::dispatch::registry::HandlerRegistry;

/// Register the built-in open behaviors on `registry`.
///
/// Resulting order (outermost to innermost):
/// 1. `ConcurrencyLimitBehavior`: reject when overloaded, if `max_concurrent_requests` is set
/// 2. `TimeoutBehavior`: enforce `default_timeout_ms`, if set
/// 3. `TracingBehavior`: record timing and outcome
///
/// Behaviors registered afterwards wrap this stack.
pub fn register_standard_behaviors(registry: &HandlerRegistry, config: &MediatorConfig) {
    registry.register_open_behavior(TracingBehavior);

    if let Some(timeout_ms) = config.default_timeout_ms {
        registry.register_open_behavior(TimeoutBehavior::new(timeout_ms));
    }
    if let Some(limit) = config.max_concurrent_requests {
        registry.register_open_behavior(ConcurrencyLimitBehavior::new(limit));
    }

    debug!(
        timeout_ms = config.default_timeout_ms,
        max_concurrent_requests = config.max_concurrent_requests,
        "registered standard behaviors"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

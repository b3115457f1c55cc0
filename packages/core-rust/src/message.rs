//! Message contracts dispatched through the mediator.
//!
//! The concrete Rust type of a message is its identity: handler lookup is keyed
//! by `TypeId`, so two structurally identical types are still distinct messages.

/// A unit of work handled by exactly one handler and answered with a
/// `Response`.
///
/// The response is shared by reference with post-processors while the
/// dispatch future is suspended, hence the `Sync` bound.
pub trait Request: Send + Sync + 'static {
    /// The value the handler produces for this request.
    type Response: Send + Sync + 'static;
}

/// A fire-and-forget request handled by exactly one handler.
///
/// Commands bypass the pipeline: no behaviors or processors are consulted.
pub trait Command: Send + Sync + 'static {}

/// An event broadcast to zero or more handlers.
pub trait Notification: Send + Sync + 'static {}

/// Short display name for a message type, used in logs and error messages.
///
/// Strips the module path so `my_app::users::CreateUser` becomes `CreateUser`.
/// Generic arguments are kept intact. Tuple, slice and array types are
/// returned unshortened.
#[must_use]
pub fn message_name<T: ?Sized>() -> &'static str {
    short_type_name(std::any::type_name::<T>())
}

fn short_type_name(full: &'static str) -> &'static str {
    if full.starts_with('(') || full.starts_with('[') {
        return full;
    }
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

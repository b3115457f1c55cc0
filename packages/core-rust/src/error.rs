//! Dispatch error taxonomy.
//!
//! Handler and behavior bodies return `anyhow::Result`. At every boundary where
//! such a result re-enters the dispatch chain it is normalized through
//! [`MediatorError::from_fault`]: cancellation kinds and already-normalized
//! faults pass through untouched, everything else becomes an
//! [`MediatorError::OperationFault`] carrying the original error as its source.

/// Errors surfaced to callers of `send`, `send_command` and `publish`.
#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    /// The dispatch input does not satisfy the contract implied by the call.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// No handler is registered for the message type.
    #[error("no handler registered for {request_type}")]
    HandlerNotFound { request_type: &'static str },

    /// A handler, behavior or processor failed. `source` is the original error.
    #[error("{origin} failed: {source}")]
    OperationFault {
        origin: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A link in the chain produced no response where one was mandatory.
    #[error("{origin} returned null instead of {response_type}")]
    NullResult {
        origin: &'static str,
        response_type: &'static str,
    },

    /// The cancellation token was observed as triggered.
    #[error("operation cancelled")]
    Cancelled,

    /// A deadline elapsed before the chain completed.
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl MediatorError {
    /// Builds an `InvalidArgument` error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Returns `true` for the cancellation kinds (`Cancelled`, `Timeout`).
    ///
    /// These are never wrapped into `OperationFault`.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout { .. })
    }

    /// Returns `true` only for `Cancelled`, the kind raised by a triggered
    /// token.
    ///
    /// A `Timeout` is a deadline local to one dispatch and does not qualify.
    #[must_use]
    pub fn is_token_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the error crosses a fault-wrapping boundary unchanged.
    #[must_use]
    pub fn passes_through(&self) -> bool {
        self.is_cancellation()
            || matches!(self, Self::OperationFault { .. } | Self::NullResult { .. })
    }

    /// Normalizes an error raised by `origin` into the dispatch taxonomy.
    ///
    /// A `MediatorError` found at the top of the error (context layers
    /// included) that [`passes_through`](Self::passes_through) is returned
    /// as-is. Any other error, including a nested dispatch's
    /// `HandlerNotFound`, is wrapped into `OperationFault` naming `origin`.
    #[must_use]
    pub fn from_fault(origin: &'static str, error: anyhow::Error) -> Self {
        match error.downcast::<MediatorError>() {
            Ok(inner) if inner.passes_through() => inner,
            Ok(inner) => Self::OperationFault {
                origin,
                source: inner.into(),
            },
            Err(source) => Self::OperationFault { origin, source },
        }
    }
}

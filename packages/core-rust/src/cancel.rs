//! Cooperative cancellation threaded through every dispatch.

pub use tokio_util::sync::CancellationToken;

use crate::error::MediatorError;

/// Converts the token state into the dispatch error taxonomy.
pub trait CancellationExt {
    /// Returns `Err(MediatorError::Cancelled)` once the token is triggered.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::Cancelled` if cancellation was requested.
    fn ensure_active(&self) -> Result<(), MediatorError>;
}

impl CancellationExt for CancellationToken {
    fn ensure_active(&self) -> Result<(), MediatorError> {
        if self.is_cancelled() {
            Err(MediatorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_token_passes() {
        let token = CancellationToken::new();
        assert!(token.ensure_active().is_ok());
    }

    #[test]
    fn cancelled_token_fails() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(token.ensure_active(), Err(MediatorError::Cancelled)));
    }

    #[test]
    fn child_observes_parent_cancellation() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        parent.cancel();
        assert!(child.ensure_active().is_err());
    }
}

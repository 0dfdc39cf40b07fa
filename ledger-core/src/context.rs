//! Per-request context threaded through every ledger call.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Request-scoped logging and cancellation plumbing.
///
/// The ledger never cancels on its own. It only hands the token to the
/// store and cache, which may abort once the caller cancels.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Context bound to a caller-owned cancellation token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            cancel,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared_with_caller() {
        let token = CancellationToken::new();
        let ctx = RequestContext::with_token(token.clone());
        assert!(!ctx.is_cancelled());

        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_request_ids_differ() {
        assert_ne!(RequestContext::new().request_id(), RequestContext::new().request_id());
    }
}

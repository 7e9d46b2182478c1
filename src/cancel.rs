//! Revocable cancellation token
//!
//! Each bulk run gets its own token. Revoking it is a one-way transition that
//! every clone observes, both by polling [`CancelToken::is_cancelled`] and by
//! awaiting [`CancelToken::cancelled`].

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle onto a shared cancellation flag
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token that has not been revoked
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state: Arc::new(state) }
    }

    /// Revoke the token. Idempotent.
    pub fn cancel(&self) {
        self.state.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the token is revoked; never resolves otherwise
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives inside `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Whether two handles refer to the same underlying token
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

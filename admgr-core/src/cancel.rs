//! Cooperative cancellation.
//!
//! Thin wrapper over `tokio_util::sync::CancellationToken` so call sites
//! across crates share one vocabulary (`check`, `is_cancelled`) without each
//! depending on `tokio-util` directly for more than this one type.

use crate::error::Error;

#[derive(Clone, Debug, Default)]
pub struct CancellationToken(tokio_util::sync::CancellationToken);

impl CancellationToken {
    pub fn new() -> Self {
        Self(tokio_util::sync::CancellationToken::new())
    }

    pub fn child(&self) -> Self {
        Self(self.0.child_token())
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }

    /// Call at every coarse-grained boundary: before a network call, before
    /// a disk write, between requests.
    pub fn check(&self, operation: &str) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::cancelled(operation))
        } else {
            Ok(())
        }
    }
}

//! Cooperative cancellation for running imports.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ImportError, Result};

/// Cloneable cancellation signal threaded through every awaited import step.
///
/// Cancelling is sticky: once [`cancel`](Self::cancel) is called every clone
/// observes it, and any in-flight [`guard`](Self::guard) resolves to
/// [`ImportError::Cancelled`].
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Fail fast if the import has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of this token, so this only
        // returns once the flag flips.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Race `future` against cancellation.
    pub async fn guard<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ImportError::Cancelled),
            value = future => Ok(value),
        }
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: std::time::Duration) -> Result<()> {
        self.guard(tokio::time::sleep(duration)).await
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

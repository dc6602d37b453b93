use crate::errors::{InspectorError, Result};
use std::time::Duration;
use tokio::sync::watch;

/// Create a connected readiness pair. The waiter side may be cloned freely.
pub fn ready_channel() -> (ReadySignal, ReadyWaiter) {
    let (tx, rx) = watch::channel(false);
    (ReadySignal { tx }, ReadyWaiter { rx })
}

/// Resolves once when the page has loaded.
#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl ReadySignal {
    /// Mark the page as ready. Later calls are no-ops.
    pub fn resolve(&self) {
        let was_ready = self.tx.send_replace(true);
        if !was_ready {
            tracing::debug!("Page readiness resolved");
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ReadyWaiter {
        ReadyWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadyWaiter {
    rx: watch::Receiver<bool>,
}

impl ReadyWaiter {
    /// Wait until the page is ready. Returns immediately if it already is.
    pub async fn wait(&mut self) -> Result<()> {
        self.rx
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| InspectorError::ReadySignalDropped)
    }

    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| InspectorError::ReadyTimeout)?
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_waiters_released_after_resolve() {
        let (signal, waiter) = ready_channel();
        let mut early = waiter.clone();
        let handle = tokio::spawn(async move { early.wait().await });

        assert!(!waiter.is_ready());
        signal.resolve();
        assert_ok!(handle.await.unwrap());

        // A waiter arriving after resolution does not block.
        let mut late = signal.subscribe();
        assert_ok!(late.wait().await);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (signal, mut waiter) = ready_channel();
        signal.resolve();
        signal.resolve();
        assert!(signal.is_ready());
        assert_ok!(waiter.wait().await);
    }

    #[tokio::test]
    async fn test_dropped_signal_is_an_error() {
        let (signal, mut waiter) = ready_channel();
        drop(signal);
        assert!(matches!(
            waiter.wait().await,
            Err(InspectorError::ReadySignalDropped)
        ));
    }

    #[tokio::test]
    async fn test_wait_timeout() {
        let (_signal, mut waiter) = ready_channel();
        assert_err!(waiter.wait_timeout(Duration::from_millis(10)).await);
    }
}

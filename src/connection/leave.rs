//! One-shot teardown signal

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Teardown signal shared by a connection's pumps and handler
///
/// Clones observe the same signal. It fires at most once; every waiter is
/// released when it does.
#[derive(Debug, Clone, Default)]
pub struct Leave {
    fired: Arc<AtomicBool>,
    token: CancellationToken,
}

impl Leave {
    /// Create an unfired signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal
    ///
    /// Returns `true` only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Whether the signal has fired
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Wait until the signal fires
    pub async fn fired(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fires_once() {
        let leave = Leave::new();
        let other = leave.clone();

        assert!(!leave.is_fired());
        assert!(other.fire());
        assert!(!leave.fire());
        assert!(leave.is_fired());
    }

    #[tokio::test]
    async fn test_all_waiters_released() {
        let leave = Leave::new();
        let a = tokio::spawn({
            let leave = leave.clone();
            async move { leave.fired().await }
        });
        let b = tokio::spawn({
            let leave = leave.clone();
            async move { leave.fired().await }
        });

        leave.fire();
        tokio::time::timeout(Duration::from_secs(1), async {
            a.await.unwrap();
            b.await.unwrap();
        })
        .await
        .expect("waiters should be released");
    }

    #[tokio::test]
    async fn test_fired_returns_immediately_after_fire() {
        let leave = Leave::new();
        leave.fire();
        tokio::time::timeout(Duration::from_millis(100), leave.fired())
            .await
            .unwrap();
    }
}

//! Distributed lock lifecycle: acquire, heartbeat-renew, release (§4.1).
//!
//! The heartbeat is a background task parented to the guard's lifetime, the
//! same shape `kimberlite-cluster`'s supervisor uses for its monitor loop
//! (`tokio::select!` over a tick interval and a stop signal).

use crate::error::{Error, Result};
use crate::ids::LockKey;
use crate::providers::{DistributedLock, DistributedLockProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Owns an acquired lock for the duration of a migration and guarantees
/// release on every exit path, including early drop.
pub struct LockGuard {
    key: LockKey,
    lock: Arc<dyn DistributedLock>,
    lost: Arc<AtomicBool>,
    heartbeat_stop: Option<oneshot::Sender<()>>,
    heartbeat_task: Option<JoinHandle<()>>,
}

impl LockGuard {
    /// Acquires `key` within `timeout` and starts a heartbeat task renewing
    /// it every `heartbeat_interval` (no heartbeat task when the interval is
    /// zero).
    pub async fn acquire(
        provider: &dyn DistributedLockProvider,
        key: LockKey,
        timeout: Duration,
        heartbeat_interval: Duration,
    ) -> Result<Self> {
        let timeout_ms = timeout.as_millis() as u64;
        let lock = provider
            .acquire(&key, timeout)
            .await?
            .ok_or_else(|| Error::LockAcquisitionFailed {
                key: key.clone(),
                timeout_ms,
            })?;
        let lock: Arc<dyn DistributedLock> = Arc::from(lock);

        let lost = Arc::new(AtomicBool::new(false));
        let (heartbeat_stop, heartbeat_task) = if heartbeat_interval.is_zero() {
            (None, None)
        } else {
            let (tx, mut rx) = oneshot::channel();
            let lock_for_task = lock.clone();
            let lost_for_task = lost.clone();
            let key_for_task = key.clone();
            let handle = tokio::spawn(async move {
                let mut tick = tokio::time::interval(heartbeat_interval);
                tick.tick().await; // first tick fires immediately; skip it
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            match lock_for_task.renew().await {
                                Ok(true) => debug!(lock = %key_for_task, "lock renewed"),
                                Ok(false) => {
                                    warn!(lock = %key_for_task, "lock renew returned false, lease lost");
                                    lost_for_task.store(true, Ordering::SeqCst);
                                    break;
                                }
                                Err(err) => {
                                    warn!(lock = %key_for_task, error = %err, "lock renew failed");
                                    lost_for_task.store(true, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                        _ = &mut rx => break,
                    }
                }
            });
            (Some(tx), Some(handle))
        };

        Ok(Self {
            key,
            lock,
            lost,
            heartbeat_stop,
            heartbeat_task,
        })
    }

    /// Returns `true` once the heartbeat has observed the lease is lost, or
    /// the underlying lock otherwise reports itself invalid.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst) || !self.lock.is_valid()
    }

    /// Returns an error if the lock has been lost; call at phase boundaries.
    pub fn check(&self) -> Result<()> {
        if self.is_lost() {
            Err(Error::LockLost(self.key.clone()))
        } else {
            Ok(())
        }
    }

    pub fn key(&self) -> &LockKey {
        &self.key
    }

    /// Stops the heartbeat and releases the lock. Idempotent.
    pub async fn release(&mut self) {
        if let Some(stop) = self.heartbeat_stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.heartbeat_task.take() {
            let _ = task.await;
        }
        self.lock.release().await;
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(stop) = self.heartbeat_stop.take() {
            let _ = stop.send(());
        }
        // `Drop` cannot await; a guard that is dropped without an explicit
        // `release().await` still stops the heartbeat task immediately, and
        // the lock provider's own lease expiry reclaims the key.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryLockProvider;

    #[tokio::test]
    async fn acquire_and_release_round_trip() {
        let provider = InMemoryLockProvider::new();
        let mut guard = LockGuard::acquire(
            &provider,
            LockKey::new("object-1"),
            Duration::from_millis(100),
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert!(!guard.is_lost());
        guard.release().await;
    }

    #[tokio::test]
    async fn second_acquire_fails_while_first_holds() {
        let provider = InMemoryLockProvider::new();
        let _first = LockGuard::acquire(
            &provider,
            LockKey::new("object-1"),
            Duration::from_millis(50),
            Duration::ZERO,
        )
        .await
        .unwrap();

        let second = LockGuard::acquire(
            &provider,
            LockKey::new("object-1"),
            Duration::from_millis(50),
            Duration::ZERO,
        )
        .await;

        assert!(matches!(second, Err(Error::LockAcquisitionFailed { .. })));
    }

    #[tokio::test]
    async fn heartbeat_detects_lost_lease() {
        let provider = InMemoryLockProvider::new();
        let mut guard = LockGuard::acquire(
            &provider,
            LockKey::new("object-1"),
            Duration::from_millis(50),
            Duration::from_millis(20),
        )
        .await
        .unwrap();

        provider.force_expire(&LockKey::new("object-1")).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(guard.is_lost());
        guard.release().await;
    }
}

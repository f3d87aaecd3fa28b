// crates/hyperchain-daemon/src/scheduler.rs
//
// Periodic task scheduler for the Hyperchain daemon.
//
// Every background worker runs as a `PeriodicTask`: a tokio task that calls a
// tick function on a fixed interval. A failed tick is logged and the next one
// is delayed by an exponential back-off (interval * 2^failures, capped at
// five minutes); one successful tick resets the delay. Tasks stop when the
// shared shutdown signal fires or when cancelled individually.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use hyperchain_core::ChainError;

/// Upper bound for the back-off delay after repeated failures.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Delay before the next tick after `failures` consecutive failed ticks.
pub fn backoff_delay(interval: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let factor = 2u32.saturating_pow(failures.min(16));
    interval.saturating_mul(factor).min(MAX_BACKOFF.max(interval))
}

/// Handle to a running periodic worker.
pub struct PeriodicTask {
    name: &'static str,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn a worker calling `tick` every `interval` until `shutdown` fires
    /// or the task is cancelled.
    pub fn spawn<F>(
        name: &'static str,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Result<(), ChainError> + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);

        let handle = tokio::spawn(async move {
            tracing::info!("{} worker started (interval {:?})", name, interval);
            let mut failures: u32 = 0;

            loop {
                if *shutdown.borrow() || *cancelled.borrow() {
                    break;
                }
                let delay = backoff_delay(interval, failures);

                tokio::select! {
                    _ = shutdown.changed() => {
                        tracing::info!("{} worker received shutdown signal", name);
                        break;
                    }
                    _ = cancelled.changed() => {
                        tracing::info!("{} worker cancelled", name);
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        match tick() {
                            Ok(()) => failures = 0,
                            Err(e) => {
                                failures = failures.saturating_add(1);
                                tracing::error!(
                                    "{} worker tick failed ({} in a row): {}. Retrying in {:?}",
                                    name,
                                    failures,
                                    e,
                                    backoff_delay(interval, failures)
                                );
                            }
                        }
                    }
                }
            }

            tracing::info!("{} worker stopped", name);
        });

        Self {
            name,
            cancel,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop this worker without touching the others.
    #[allow(dead_code)]
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    #[allow(dead_code)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("{} worker panicked: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let interval = Duration::from_secs(5);
        assert_eq!(backoff_delay(interval, 0), interval);
        assert_eq!(backoff_delay(interval, 1), Duration::from_secs(10));
        assert_eq!(backoff_delay(interval, 3), Duration::from_secs(40));
        assert_eq!(backoff_delay(interval, 10), MAX_BACKOFF);
        assert_eq!(backoff_delay(interval, u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_backoff_never_below_interval() {
        let hourly = Duration::from_secs(3600);
        assert_eq!(backoff_delay(hourly, 2), hourly);
    }

    #[tokio::test]
    async fn test_task_ticks_until_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let task = PeriodicTask::spawn("test", Duration::from_millis(5), shutdown_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        task.join().await;
        assert!(count.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_only_one_task() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let a = PeriodicTask::spawn("a", Duration::from_millis(5), shutdown_rx.clone(), || Ok(()));
        let b = PeriodicTask::spawn("b", Duration::from_millis(5), shutdown_rx, || Ok(()));

        a.cancel();
        assert_eq!(a.name(), "a");
        a.join().await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!b.is_finished());
        b.cancel();
        b.join().await;
    }

    #[tokio::test]
    async fn test_failing_tick_keeps_task_alive() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();

        let task = PeriodicTask::spawn("failing", Duration::from_millis(5), shutdown_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ChainError::SigningFailure("no key".to_string()))
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!task.is_finished());
        assert!(count.load(Ordering::SeqCst) >= 1);
        shutdown_tx.send(true).unwrap();
        task.join().await;
    }
}

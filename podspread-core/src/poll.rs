//! Timed condition polling
//!
//! Re-checks an async condition at a fixed interval until it holds, the
//! deadline passes, or shutdown is signalled.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, timeout_at, Instant, MissedTickBehavior};

/// Shortest period a ticker accepts; zero panics in tokio.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Condition held; carries the time it took
    Satisfied(Duration),
    /// Deadline passed first
    TimedOut,
    /// Shutdown was signalled first
    Cancelled,
}

/// Poll `check` every `every` for up to `timeout`.
///
/// The first check runs one interval after the call, not immediately. A
/// check still running when the deadline passes is dropped. `every` is
/// raised to [`MIN_PERIOD`] if shorter.
pub async fn poll_until<F, Fut>(
    every: Duration,
    timeout: Duration,
    shutdown: &mut watch::Receiver<bool>,
    mut check: F,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let every = every.max(MIN_PERIOD);
    let start = Instant::now();

    let polling = async move {
        let mut ticker = interval_at(start + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if check().await {
                return start.elapsed();
            }
        }
    };

    tokio::select! {
        result = timeout_at(start + timeout, polling) => match result {
            Ok(elapsed) => PollOutcome::Satisfied(elapsed),
            Err(_) => PollOutcome::TimedOut,
        },
        _ = shutdown_signalled(shutdown) => PollOutcome::Cancelled,
    }
}

/// Resolves once shutdown is requested. Never resolves if the sender is
/// dropped without signalling.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_after_some_checks() {
        let (_tx, mut rx) = watch::channel(false);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let outcome = poll_until(Duration::from_secs(2), Duration::from_secs(30), &mut rx, || {
            let counter = counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 }
        })
        .await;

        match outcome {
            PollOutcome::Satisfied(elapsed) => {
                assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let (_tx, mut rx) = watch::channel(false);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let outcome = poll_until(Duration::from_secs(2), Duration::from_secs(5), &mut rx, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            }
        })
        .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            poll_until(Duration::from_secs(2), Duration::from_secs(60), &mut rx, || async {
                false
            })
            .await
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        tx.send(true).unwrap();

        assert_eq!(handle.await.unwrap(), PollOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let (_tx, mut rx) = watch::channel(false);

        let outcome = poll_until(Duration::ZERO, Duration::from_secs(1), &mut rx, || async {
            true
        })
        .await;
        assert!(matches!(
            outcome,
            PollOutcome::Satisfied(elapsed) if elapsed >= MIN_PERIOD && elapsed < Duration::from_millis(3)
        ));

        let outcome =
            poll_until(Duration::ZERO, Duration::from_millis(5), &mut rx, || async { false })
                .await;
        assert_eq!(outcome, PollOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_does_not_cancel() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let outcome =
            poll_until(Duration::from_secs(1), Duration::from_secs(3), &mut rx, || async {
                false
            })
            .await;
        assert_eq!(outcome, PollOutcome::TimedOut);
    }
}

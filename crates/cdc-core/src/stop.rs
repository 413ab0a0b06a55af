//! Cooperative stop helpers.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep for `duration` unless `stop` fires first.
///
/// Returns `true` when the sleep was cut short by a stop request, so the
/// caller can leave its loop instead of starting another iteration.
///
/// A zero duration still yields to the scheduler once, so a polling loop
/// configured without an idle interval cannot starve sibling tasks.
pub async fn sleep_or_stopped(stop: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        tokio::task::yield_now().await;
        return stop.is_cancelled();
    }
    tokio::select! {
        _ = stop.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_completes_without_stop() {
        let stop = CancellationToken::new();
        assert!(!sleep_or_stopped(&stop, Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_stop_interrupts_sleep() {
        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        assert!(sleep_or_stopped(&stop, Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_zero_duration_lets_other_tasks_run() {
        // Single-threaded runtime: the spawned task only runs if the loop yields.
        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            trigger.cancel();
        });

        let mut iterations = 0;
        while !sleep_or_stopped(&stop, Duration::ZERO).await {
            iterations += 1;
            assert!(iterations < 1000, "stop was never observed");
        }
    }

    #[tokio::test]
    async fn test_already_stopped_returns_immediately() {
        let stop = CancellationToken::new();
        stop.cancel();
        assert!(sleep_or_stopped(&stop, Duration::from_secs(30)).await);
        assert!(sleep_or_stopped(&stop, Duration::ZERO).await);
    }
}

//! Periodic task driver.
//!
//! Every perpetual loop in the system runs through [`spawn_periodic`]: run the
//! work, measure the elapsed time, sleep for the remainder of the period. A
//! cycle that overruns its period is logged and the next cycle starts
//! immediately - overruns are skipped, never queued, so there is no backlog
//! accumulation. Iteration errors are logged and the loop continues at its
//! next scheduled period; no single failed cycle aborts the process.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawns a named perpetual task with a fixed period.
///
/// `work` runs on the runtime worker, so it must stay brief: lock, compute,
/// copy. Cancellation is cooperative - checked at the top of every cycle and
/// while sleeping - so shutdown latency is bounded by one period plus one
/// work invocation.
pub fn spawn_periodic<F, E>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut work: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    tokio::spawn(async move {
        debug!(
            task = name,
            period_ms = period.as_millis() as u64,
            "periodic task started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let started = Instant::now();
            if let Err(e) = work() {
                warn!(task = name, error = %e, "periodic task iteration failed");
            }
            let elapsed = started.elapsed();

            if elapsed >= period {
                warn!(
                    task = name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    period_ms = period.as_millis() as u64,
                    "missed deadline, starting next cycle immediately"
                );
                continue;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(period - elapsed) => {}
            }
        }

        debug!(task = name, "periodic task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_repeatedly_at_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&count);
        let handle = spawn_periodic(
            "test-tick",
            Duration::from_millis(10),
            cancel.clone(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), std::convert::Infallible>(())
            },
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        handle.await.expect("task joins");

        let iterations = count.load(Ordering::SeqCst);
        assert!(iterations >= 5, "expected several cycles, got {iterations}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overrunning_work_keeps_iterating() {
        let count = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&count);
        let handle = spawn_periodic(
            "test-overrun",
            Duration::from_millis(5),
            cancel.clone(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(15));
                Ok::<(), std::convert::Infallible>(())
            },
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.expect("task joins");

        // Overruns skip the sleep and iterate immediately; no backlog, but no
        // stall either.
        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_iteration_error_does_not_stop_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&count);
        let handle = spawn_periodic(
            "test-error",
            Duration::from_millis(10),
            cancel.clone(),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("iteration failed")
            },
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        cancel.cancel();
        handle.await.expect("task joins");

        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_stops_promptly() {
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(
            "test-cancel",
            Duration::from_secs(3600),
            cancel.clone(),
            || Ok::<(), std::convert::Infallible>(()),
        );

        // The task sleeps most of its period; cancellation must cut through.
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled before timeout")
            .expect("task joins");
    }
}

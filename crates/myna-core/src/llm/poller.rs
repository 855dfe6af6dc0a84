//! Bounded polling of thread runs

use super::{ConversationClient, RunStatus};
use crate::config::ThreadConfig;
use crate::error::{MynaError, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Waits for a run to finish with exponential backoff and a hard deadline.
///
/// A run abandoned by timeout or cancellation is cancelled on the server
/// before returning, so callers never leave work running behind them.
#[derive(Debug, Clone)]
pub struct RunPoller {
    initial: Duration,
    backoff: f64,
    max_interval: Duration,
    max_wait: Duration,
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl RunPoller {
    /// Intervals are floored at 1 ms and a non-finite backoff is treated
    /// as a fixed interval
    pub fn new(
        initial: Duration,
        backoff: f64,
        max_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        let initial = initial.max(MIN_INTERVAL);
        let backoff = if backoff.is_finite() {
            backoff.max(1.0)
        } else {
            1.0
        };
        Self {
            initial,
            backoff,
            max_interval: max_interval.max(initial),
            max_wait,
        }
    }

    pub fn from_config(config: &ThreadConfig) -> Self {
        Self::new(
            Duration::from_millis(config.poll_initial_ms),
            config.poll_backoff,
            Duration::from_millis(config.poll_max_ms),
            Duration::from_secs(config.max_wait_secs),
        )
    }

    /// Poll until the run completes, fails, times out or `cancel` fires
    pub async fn wait(
        &self,
        client: &dyn ConversationClient,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let deadline = Instant::now() + self.max_wait;
        let mut interval = self.initial;
        let mut polls = 0u32;

        loop {
            if cancel.is_cancelled() {
                abandon(client, thread_id, run_id).await;
                return Err(MynaError::Cancelled);
            }

            polls += 1;
            match client.run_status(thread_id, run_id).await? {
                RunStatus::Completed => {
                    tracing::debug!("Run {} completed after {} polls", run_id, polls);
                    return Ok(());
                }
                RunStatus::Failed(reason) => {
                    return Err(MynaError::Thread(format!("run {} failed: {}", run_id, reason)));
                }
                RunStatus::Queued | RunStatus::InProgress => {}
            }

            let now = Instant::now();
            if now >= deadline {
                abandon(client, thread_id, run_id).await;
                return Err(MynaError::Timeout(format!(
                    "run {} still pending after {:?}",
                    run_id, self.max_wait
                )));
            }

            let pause = interval.min(deadline - now);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    abandon(client, thread_id, run_id).await;
                    return Err(MynaError::Cancelled);
                }
                _ = tokio::time::sleep(pause) => {}
            }

            interval = self.next_interval(interval);
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff).min(self.max_interval)
    }
}

async fn abandon(client: &dyn ConversationClient, thread_id: &str, run_id: &str) {
    if let Err(e) = client.cancel_run(thread_id, run_id).await {
        tracing::warn!("Failed to cancel run {} on {}: {}", run_id, thread_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Reports `pending` polls as in progress, then `last`
    struct ScriptedRuns {
        pending: usize,
        last: RunStatus,
        polls: AtomicUsize,
        cancelled: Mutex<Vec<String>>,
    }

    impl ScriptedRuns {
        fn new(pending: usize, last: RunStatus) -> Self {
            Self {
                pending,
                last,
                polls: AtomicUsize::new(0),
                cancelled: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConversationClient for ScriptedRuns {
        async fn create_thread(&self, _instructions: &str) -> Result<String> {
            Ok("thread".to_string())
        }

        async fn send(&self, _thread_id: &str, _message: &str) -> Result<()> {
            Ok(())
        }

        async fn start_run(&self, _thread_id: &str) -> Result<String> {
            Ok("run".to_string())
        }

        async fn run_status(&self, _thread_id: &str, _run_id: &str) -> Result<RunStatus> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.pending {
                Ok(RunStatus::InProgress)
            } else {
                Ok(self.last.clone())
            }
        }

        async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<()> {
            self.cancelled.lock().unwrap().push(run_id.to_string());
            Ok(())
        }

        async fn latest_message(&self, _thread_id: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn delete_thread(&self, _thread_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn poller(max_wait_secs: u64) -> RunPoller {
        RunPoller::new(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(800),
            Duration::from_secs(max_wait_secs),
        )
    }

    #[test]
    fn test_backoff_is_capped() {
        let p = poller(10);
        let mut interval = Duration::from_millis(100);
        let mut seen = Vec::new();
        for _ in 0..5 {
            interval = p.next_interval(interval);
            seen.push(interval.as_millis());
        }
        assert_eq!(seen, vec![200, 400, 800, 800, 800]);
    }

    #[test]
    fn test_degenerate_settings_still_back_off() {
        let p = RunPoller::new(
            Duration::ZERO,
            f64::INFINITY,
            Duration::ZERO,
            Duration::from_secs(1),
        );
        assert_eq!(p.initial, MIN_INTERVAL);
        assert_eq!(p.next_interval(p.initial), MIN_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_initial_interval_is_throttled() {
        let runs = ScriptedRuns::new(usize::MAX, RunStatus::Completed);
        let token = CancellationToken::new();
        let p = RunPoller::new(
            Duration::ZERO,
            2.0,
            Duration::from_millis(200),
            Duration::from_secs(1),
        );

        let err = p.wait(&runs, "t", "r", &token).await.unwrap_err();

        assert!(matches!(err, MynaError::Timeout(_)));
        // 1, 2, 4 ... 128 ms, then 200 ms steps until the deadline
        assert!(runs.polls.load(Ordering::SeqCst) < 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_after_pending_polls() {
        let runs = ScriptedRuns::new(3, RunStatus::Completed);
        let token = CancellationToken::new();

        poller(10).wait(&runs, "t", "r", &token).await.unwrap();

        assert_eq!(runs.polls.load(Ordering::SeqCst), 4);
        assert!(runs.cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_is_an_error() {
        let runs = ScriptedRuns::new(1, RunStatus::Failed("server_error".to_string()));
        let token = CancellationToken::new();

        let err = poller(10).wait(&runs, "t", "r", &token).await.unwrap_err();
        assert!(matches!(err, MynaError::Thread(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_server_run() {
        let runs = ScriptedRuns::new(usize::MAX, RunStatus::Completed);
        let token = CancellationToken::new();

        let started = Instant::now();
        let err = poller(3).wait(&runs, "t", "r", &token).await.unwrap_err();

        assert!(matches!(err, MynaError::Timeout(_)));
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(*runs.cancelled.lock().unwrap(), vec!["r".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_abandons_wait() {
        let runs = ScriptedRuns::new(usize::MAX, RunStatus::Completed);
        let token = CancellationToken::new();
        let trigger = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let err = poller(60).wait(&runs, "t", "r", &token).await.unwrap_err();
        assert!(matches!(err, MynaError::Cancelled));
        assert_eq!(runs.cancelled.lock().unwrap().len(), 1);
    }
}

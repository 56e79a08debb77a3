// ABOUTME: Per-step retry scheduling with exponential backoff
// ABOUTME: Drives a worker executor until success, retries run out, or retry is disabled

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::contract::{ErrorKind, Task, WorkerResult};
use crate::worker::WorkerExecutor;
use crate::workflow::WorkflowStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSettings {
    /// Waiting time before retry `n` is `unit * 2^n`.
    pub unit: Duration,
    pub max: Duration,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_on_failure: bool,
    pub backoff: BackoffSettings,
}

impl RetryPolicy {
    pub fn for_step(step: &WorkflowStep, backoff: BackoffSettings) -> Self {
        Self {
            max_retries: step.max_retries,
            retry_on_failure: step.retry_on_failure,
            backoff,
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self {
            max_retries: 0,
            retry_on_failure: false,
            backoff: BackoffSettings::default(),
        }
    }

    /// Upper bound on attempts under this policy.
    pub fn max_attempts(&self) -> u32 {
        if self.retry_on_failure {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Delay before retry number `retry` (1-based), capped at the backoff maximum.
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.backoff
            .unit
            .checked_mul(factor)
            .map_or(self.backoff.max, |delay| delay.min(self.backoff.max))
    }
}

/// Final result of a step plus how many attempts it took.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub result: WorkerResult,
    pub attempts: u32,
}

/// Run `task` on `executor`, retrying per `policy`. Always yields the last attempt's result.
/// Rejected input is final: the same task would be rejected again.
pub async fn run_with_retry(executor: &WorkerExecutor, task: Task, policy: &RetryPolicy) -> StepOutcome {
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(
            "Dispatching task {} to {} (attempt {}/{})",
            task.id,
            executor.id(),
            attempts,
            max_attempts
        );

        let result = executor.process(task.clone()).await;

        if result.is_successful() {
            return StepOutcome { result, attempts };
        }

        if result.error_kind() == Some(ErrorKind::Validation) {
            warn!("Task {} rejected by {}, not retrying", task.id, executor.id());
            return StepOutcome { result, attempts };
        }

        if attempts >= max_attempts {
            if max_attempts > 1 {
                error!("Task {} failed after {} attempts", task.id, attempts);
            }
            return StepOutcome { result, attempts };
        }

        let delay = policy.calculate_delay(attempts);
        warn!(
            "Retrying task {} (retry {}/{}) in {:?}",
            task.id, attempts, policy.max_retries, delay
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Status;
    use crate::registry::Mailbox;
    use crate::worker::{ExecutorSettings, StaticWorker, StaticWorkerConfig, WorkerProfile};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy(max_retries: u32, retry_on_failure: bool) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            retry_on_failure,
            backoff: BackoffSettings {
                unit: Duration::from_secs(1),
                max: Duration::from_secs(300),
            },
        }
    }

    fn flaky_executor(fail_times: u32) -> WorkerExecutor {
        let mut config = StaticWorkerConfig::new("supply_agent");
        config.fail_times = fail_times;
        WorkerExecutor::new(
            WorkerProfile::new("supply_agent", "Supply Checker"),
            Arc::new(StaticWorker::new(config)),
            ExecutorSettings::default(),
            Mailbox::new(4),
        )
    }

    #[test]
    fn test_delay_calculation() {
        let policy = policy(3, true);
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(8));
        assert_eq!(policy.calculate_delay(40), Duration::from_secs(300));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            retry_on_failure: true,
            backoff: BackoffSettings {
                unit: Duration::from_millis(500),
                max: Duration::from_millis(1500),
            },
        };
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(1500));
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(policy(3, true).max_attempts(), 4);
        assert_eq!(policy(3, false).max_attempts(), 1);
        assert_eq!(RetryPolicy::once().max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_backoff() {
        let executor = flaky_executor(2);
        let start = Instant::now();

        let outcome = run_with_retry(&executor, Task::new("check_supply", "check"), &policy(3, true)).await;

        assert_eq!(outcome.result.status, Status::Success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(executor.attempts_for("check_supply").await, 3);
        // 2 units before the first retry, 4 before the second.
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(start.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_last_failure() {
        let executor = flaky_executor(10);

        let outcome = run_with_retry(&executor, Task::new("check_supply", "check"), &policy(2, true)).await;

        assert_eq!(outcome.result.status, Status::Failed);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(
            outcome.result.error.as_deref(),
            Some("supply_agent failed on attempt 3")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_input_is_not_retried() {
        let mut config = StaticWorkerConfig::new("supply_agent");
        config.required_parameters = vec!["warehouse".to_string()];
        let executor = WorkerExecutor::new(
            WorkerProfile::new("supply_agent", "Supply Checker"),
            Arc::new(StaticWorker::new(config)),
            ExecutorSettings::default(),
            Mailbox::new(4),
        );
        let start = Instant::now();

        let outcome = run_with_retry(&executor, Task::new("check_supply", "check"), &policy(3, true)).await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.result.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(executor.attempts_for("check_supply").await, 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retry_disabled_runs_once() {
        let executor = flaky_executor(1);

        let outcome = run_with_retry(&executor, Task::new("check_supply", "check"), &policy(3, false)).await;

        assert_eq!(outcome.result.status, Status::Failed);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(executor.history(10).await.len(), 1);
    }
}

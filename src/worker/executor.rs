// ABOUTME: Per-worker executor turning a task into exactly one result per attempt
// ABOUTME: Validates input, enforces deadlines, absorbs failures, and records bounded history

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use super::history::{History, HistoryStats};
use super::{Worker, WorkerOutput, WorkerProfile};
use crate::contract::{ErrorKind, Priority, Status, Task, WorkerResult};
use crate::registry::Mailbox;

pub const INVALID_INPUT: &str = "invalid input";
pub const EXECUTION_TIMEOUT: &str = "execution timeout";

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Used when a task carries no deadline.
    pub default_timeout: Duration,
    pub history_capacity: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            history_capacity: 1000,
        }
    }
}

/// Point-in-time status of one registered worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub capabilities: Vec<String>,
    pub priority: Priority,
    pub tasks_completed: u64,
    pub success_rate: f64,
    pub average_execution_time: Duration,
}

pub struct WorkerExecutor {
    profile: WorkerProfile,
    worker: Arc<dyn Worker>,
    settings: ExecutorSettings,
    in_flight: Arc<AtomicUsize>,
    history: Mutex<History>,
    mailbox: Mailbox,
}

impl std::fmt::Debug for WorkerExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerExecutor")
            .field("profile", &self.profile)
            .field("settings", &self.settings)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

/// Decrements the in-flight counter on drop, so an abandoned attempt
/// never leaves the worker looking busy.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerExecutor {
    pub fn new(
        profile: WorkerProfile,
        worker: Arc<dyn Worker>,
        settings: ExecutorSettings,
        mailbox: Mailbox,
    ) -> Self {
        let history = History::new(settings.history_capacity);
        info!("Initialized worker: {} ({})", profile.name, profile.id);

        Self {
            profile,
            worker,
            settings,
            in_flight: Arc::new(AtomicUsize::new(0)),
            history: Mutex::new(history),
            mailbox,
        }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn profile(&self) -> &WorkerProfile {
        &self.profile
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Timeout for tasks without a deadline: the profile's, else the executor default.
    pub fn attempt_timeout(&self) -> Duration {
        self.profile.timeout.unwrap_or(self.settings.default_timeout)
    }

    /// Running while at least one attempt is in flight, Idle otherwise.
    pub fn current_status(&self) -> Status {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            Status::Running
        } else {
            Status::Idle
        }
    }

    /// Run one attempt. Never fails: every outcome is folded into the result.
    pub async fn process(&self, task: Task) -> WorkerResult {
        let start_time = Instant::now();
        let _in_flight = InFlightGuard::enter(&self.in_flight);

        debug!("Worker {} processing task {}", self.profile.id, task.id);

        let result = self
            .run_attempt(task)
            .await
            .with_execution_time(start_time.elapsed());

        match result.status {
            Status::Success => info!(
                "Task {} completed by {} in {:?}",
                result.task_id, self.profile.id, result.execution_time
            ),
            Status::TimedOut => error!("Task {} timed out on {}", result.task_id, self.profile.id),
            _ => error!(
                "Task {} failed on {}: {}",
                result.task_id,
                self.profile.id,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        }

        self.history.lock().await.record(result.clone());
        result
    }

    async fn run_attempt(&self, task: Task) -> WorkerResult {
        let worker_id = self.profile.id.clone();
        let task_id = task.id.clone();

        if !self.worker.validate(&task).await {
            warn!("Worker {} rejected task {}: invalid input", worker_id, task_id);
            return WorkerResult::failure(
                worker_id,
                task_id,
                Status::Failed,
                ErrorKind::Validation,
                INVALID_INPUT,
            );
        }

        let deadline = task.time_remaining().unwrap_or_else(|| self.attempt_timeout());

        // Spawned so a panicking worker surfaces as a JoinError instead of
        // unwinding through the scheduler. On timeout the handle is dropped and
        // the execution keeps running detached; its output is discarded.
        let worker = Arc::clone(&self.worker);
        let handle = tokio::spawn(async move { worker.execute(task).await });

        match timeout(deadline, handle).await {
            Ok(Ok(Ok(output))) => Self::success_result(worker_id, task_id, output),
            Ok(Ok(Err(worker_error))) => WorkerResult::failure(
                worker_id,
                task_id,
                Status::Failed,
                worker_error.kind(),
                worker_error.to_string(),
            ),
            Ok(Err(join_error)) => {
                let message = if join_error.is_panic() {
                    format!("worker panicked: {}", panic_message(join_error.into_panic()))
                } else {
                    "worker execution was cancelled".to_string()
                };
                WorkerResult::failure(worker_id, task_id, Status::Failed, ErrorKind::Panic, message)
            }
            Err(_) => {
                warn!("Task {} exceeded its deadline of {:?}", task_id, deadline);
                WorkerResult::failure(
                    worker_id,
                    task_id,
                    Status::TimedOut,
                    ErrorKind::Timeout,
                    EXECUTION_TIMEOUT,
                )
            }
        }
    }

    fn success_result(worker_id: String, task_id: String, output: WorkerOutput) -> WorkerResult {
        let mut result = WorkerResult::success(worker_id, task_id, output.payload, output.confidence);
        result.metadata = output.metadata;
        result
    }

    pub async fn stats(&self) -> HistoryStats {
        self.history.lock().await.stats()
    }

    pub async fn status(&self) -> WorkerStatus {
        let stats = self.stats().await;

        WorkerStatus {
            id: self.profile.id.clone(),
            name: self.profile.name.clone(),
            status: self.current_status(),
            capabilities: self.profile.capabilities.clone(),
            priority: self.profile.priority,
            tasks_completed: stats.attempts,
            success_rate: stats.success_rate,
            average_execution_time: stats.average_execution_time,
        }
    }

    /// The most recent `limit` attempts, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<WorkerResult> {
        self.history.lock().await.recent(limit)
    }

    pub async fn attempts_for(&self, task_id: &str) -> usize {
        self.history.lock().await.attempts_for(task_id)
    }

    pub async fn reset(&self) {
        self.history.lock().await.clear();
        info!("Worker {} reset", self.profile.id);
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

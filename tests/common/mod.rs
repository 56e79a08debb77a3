// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Scripted test workers, fast orchestrator settings, and temp file environments

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use agent_orchestrator::engine::{BackoffSettings, Orchestrator, OrchestratorSettings};
use agent_orchestrator::worker::{ExecutorSettings, Worker, WorkerError, WorkerOutput, WorkerProfile};
use agent_orchestrator::{Confidence, JsonMap, Task, Workflow};

/// What a scripted worker does on one call to `execute`.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(String),
    /// Sleep this long, then succeed.
    Sleep(Duration),
    FailAfter(Duration, String),
    Panic,
}

/// A worker whose behaviour is scripted per attempt. Once the script runs out
/// it keeps succeeding. Every executed task is recorded.
pub struct ScriptedWorker {
    id: String,
    confidence: f64,
    payload: JsonMap,
    script: Mutex<VecDeque<Step>>,
    accept: bool,
    calls: Arc<Mutex<Vec<Task>>>,
    dispatch_log: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedWorker {
    pub fn new(id: &str) -> Self {
        let mut payload = JsonMap::new();
        payload.insert("source".to_string(), json!(id));

        Self {
            id: id.to_string(),
            confidence: 0.8,
            payload,
            script: Mutex::new(VecDeque::new()),
            accept: true,
            calls: Arc::new(Mutex::new(Vec::new())),
            dispatch_log: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_payload(mut self, key: &str, value: serde_json::Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }

    pub fn with_script<I: IntoIterator<Item = Step>>(self, steps: I) -> Self {
        self.script
            .lock()
            .unwrap()
            .extend(steps);
        self
    }

    pub fn failing(self, message: &str) -> Self {
        self.with_script(std::iter::repeat(Step::Fail(message.to_string())).take(100))
    }

    pub fn rejecting(mut self) -> Self {
        self.accept = false;
        self
    }

    /// Share an execution log across workers to observe dispatch order.
    pub fn with_dispatch_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.dispatch_log = Some(log);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<Task>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    async fn validate(&self, _task: &Task) -> bool {
        self.accept
    }

    async fn execute(&self, task: Task) -> Result<WorkerOutput, WorkerError> {
        self.calls.lock().unwrap().push(task.clone());
        if let Some(log) = &self.dispatch_log {
            log.lock().unwrap().push(self.id.clone());
        }

        let step = self.script.lock().unwrap().pop_front().unwrap_or(Step::Succeed);
        match step {
            Step::Succeed => {}
            Step::Fail(message) => return Err(WorkerError::execution(message)),
            Step::Sleep(duration) => tokio::time::sleep(duration).await,
            Step::FailAfter(duration, message) => {
                tokio::time::sleep(duration).await;
                return Err(WorkerError::execution(message));
            }
            Step::Panic => panic!("{} blew up", self.id),
        }

        Ok(WorkerOutput::new(
            self.payload.clone(),
            Confidence::new(self.confidence).unwrap(),
        ))
    }
}

/// Registers workers and keeps their call logs reachable from the test.
pub struct TestHarness {
    pub orchestrator: Orchestrator,
    calls: Vec<(String, Arc<Mutex<Vec<Task>>>)>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(fast_settings())
    }

    pub fn with_settings(settings: OrchestratorSettings) -> Self {
        Self {
            orchestrator: Orchestrator::new(settings),
            calls: Vec::new(),
        }
    }

    pub fn worker(mut self, worker: ScriptedWorker) -> Self {
        let id = worker.id.clone();
        self.calls.push((id.clone(), worker.calls()));
        self.orchestrator
            .register_worker(WorkerProfile::new(id.clone(), id), Arc::new(worker));
        self
    }

    pub fn workflow(mut self, workflow: Workflow) -> Self {
        self.orchestrator.register_workflow(workflow);
        self
    }

    pub fn calls_for(&self, worker_id: &str) -> Vec<Task> {
        self.calls
            .iter()
            .find(|(id, _)| id == worker_id)
            .map(|(_, calls)| calls.lock().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .iter()
            .map(|(_, calls)| calls.lock().unwrap().len())
            .sum()
    }
}

/// Backoff in milliseconds instead of seconds so retries stay fast.
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        orchestrator_id: "test".to_string(),
        executor: ExecutorSettings {
            default_timeout: Duration::from_secs(5),
            history_capacity: 100,
        },
        backoff: BackoffSettings {
            unit: Duration::from_millis(1),
            max: Duration::from_millis(50),
        },
        execution_history_capacity: 10,
        mailbox_capacity: 8,
        max_concurrent: 8,
    }
}

/// Second-based backoff, for tests running on paused time.
pub fn real_backoff_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        backoff: BackoffSettings::default(),
        ..fast_settings()
    }
}

pub fn context(pairs: &[(&str, serde_json::Value)]) -> JsonMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }
}

// ABOUTME: Configurable in-process worker returning a fixed payload
// ABOUTME: Backs the CLI and demos with optional delay, required parameters, and scripted failures

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{Worker, WorkerError, WorkerOutput, WorkerProfile};
use crate::contract::{Confidence, JsonMap, Priority, Task};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticWorkerConfig {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub payload: JsonMap,
    #[serde(default = "default_confidence")]
    pub confidence: Confidence,
    #[serde(with = "humantime_serde", default)]
    pub delay: Option<Duration>,
    /// Parameters that must be present for `validate` to accept a task.
    #[serde(default)]
    pub required_parameters: Vec<String>,
    /// Fail this many attempts before succeeding.
    #[serde(default)]
    pub fail_times: u32,
    pub failure_message: Option<String>,
    /// Attempt timeout for this worker; the orchestrator default when unset.
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_confidence() -> Confidence {
    Confidence::new(0.9).unwrap_or(Confidence::FULL)
}

impl StaticWorkerConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            capabilities: Vec::new(),
            payload: JsonMap::new(),
            confidence: default_confidence(),
            delay: None,
            required_parameters: Vec::new(),
            fail_times: 0,
            failure_message: None,
            timeout: None,
            priority: Priority::default(),
            enabled: true,
        }
    }

    pub fn profile(&self) -> WorkerProfile {
        let profile = WorkerProfile::new(
            self.id.clone(),
            self.name.clone().unwrap_or_else(|| self.id.clone()),
        )
        .with_capabilities(self.capabilities.clone())
        .with_priority(self.priority)
        .with_enabled(self.enabled);

        match self.timeout {
            Some(timeout) => profile.with_timeout(timeout),
            None => profile,
        }
    }
}

#[derive(Debug)]
pub struct StaticWorker {
    config: StaticWorkerConfig,
    attempts: AtomicU32,
}

impl StaticWorker {
    pub fn new(config: StaticWorkerConfig) -> Self {
        Self {
            config,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &StaticWorkerConfig {
        &self.config
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for StaticWorker {
    async fn validate(&self, task: &Task) -> bool {
        self.config
            .required_parameters
            .iter()
            .all(|name| task.parameters.contains_key(name))
    }

    async fn execute(&self, task: Task) -> Result<WorkerOutput, WorkerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Static worker {} running {} (attempt {})",
            self.config.id, task.task_type, attempt
        );

        if let Some(delay) = self.config.delay {
            tokio::time::sleep(delay).await;
        }

        if attempt <= self.config.fail_times {
            let message = self
                .config
                .failure_message
                .clone()
                .unwrap_or_else(|| format!("{} failed on attempt {}", self.config.id, attempt));
            return Err(WorkerError::Execution(message));
        }

        let mut payload = self.config.payload.clone();
        payload.insert("action".to_string(), task.task_type.clone().into());

        Ok(WorkerOutput::new(payload, self.config.confidence).with_metadata("attempt", attempt))
    }
}

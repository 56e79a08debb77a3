// ABOUTME: Worker capability interface and the executor that wraps every registered worker
// ABOUTME: Workers implement validate/execute; the executor adds deadlines, history, and status

pub mod executor;
pub mod history;
pub mod static_worker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::contract::{Confidence, ErrorKind, JsonMap, Priority, Task};

pub use executor::{ExecutorSettings, WorkerExecutor, WorkerStatus};
pub use history::{History, HistoryStats};
pub use static_worker::{StaticWorker, StaticWorkerConfig};

/// The dispatch boundary. Concrete workers may call a local function, an HTTP
/// service, or a queue; the orchestrator only sees these two operations.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Cheap input check. Returning false fails the attempt without calling `execute`.
    async fn validate(&self, task: &Task) -> bool;

    async fn execute(&self, task: Task) -> Result<WorkerOutput, WorkerError>;
}

/// Errors a worker reports from `execute`. The message is kept verbatim in the result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error("{0}")]
    Execution(String),

    /// Transport-level failure reaching the worker.
    #[error("{0}")]
    Dispatch(String),
}

impl WorkerError {
    pub fn execution(message: impl Into<String>) -> Self {
        WorkerError::Execution(message.into())
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        WorkerError::Dispatch(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Execution(_) => ErrorKind::Execution,
            WorkerError::Dispatch(_) => ErrorKind::Dispatch,
        }
    }
}

/// What a successful `execute` hands back; the executor turns it into a `WorkerResult`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerOutput {
    pub payload: JsonMap,
    pub confidence: Confidence,
    pub metadata: JsonMap,
}

impl WorkerOutput {
    pub fn new(payload: JsonMap, confidence: Confidence) -> Self {
        Self {
            payload,
            confidence,
            metadata: JsonMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Descriptive information and per-worker settings supplied at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Attempt timeout for tasks without a deadline. Falls back to the executor default.
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
    /// Stamped on every task dispatched to this worker.
    #[serde(default)]
    pub priority: Priority,
    /// Disabled workers are not registered.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl WorkerProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: Vec::new(),
            timeout: None,
            priority: Priority::default(),
            enabled: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }
}

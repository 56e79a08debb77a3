// ABOUTME: Worker result types produced once per execution attempt
// ABOUTME: Defines worker status, confidence scores, failure kinds, and result construction helpers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ContractError, Result};
use super::JsonMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Running,
    Success,
    Failed,
    TimedOut,
}

impl Status {
    /// Success, Failed, and TimedOut end an attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failed | Status::TimedOut)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Running => write!(f, "running"),
            Status::Success => write!(f, "success"),
            Status::Failed => write!(f, "failed"),
            Status::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Confidence score in the closed range [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ContractError::ConfidenceOutOfRange(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ContractError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(confidence: Confidence) -> Self {
        confidence.0
    }
}

/// Why an attempt did not succeed. Stamped into result metadata as `error_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Timeout,
    Execution,
    Dispatch,
    Panic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Execution => "execution",
            ErrorKind::Dispatch => "dispatch",
            ErrorKind::Panic => "panic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub worker_id: String,
    pub task_id: String,
    pub status: Status,
    #[serde(default)]
    pub payload: JsonMap,
    #[serde(default)]
    pub error: Option<String>,
    pub execution_time: Duration,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub metadata: JsonMap,
    pub timestamp: DateTime<Utc>,
}

impl WorkerResult {
    pub fn success(
        worker_id: impl Into<String>,
        task_id: impl Into<String>,
        payload: JsonMap,
        confidence: Confidence,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            task_id: task_id.into(),
            status: Status::Success,
            payload,
            error: None,
            execution_time: Duration::ZERO,
            confidence,
            metadata: JsonMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// A failed or timed-out attempt. Confidence is always zero.
    pub fn failure(
        worker_id: impl Into<String>,
        task_id: impl Into<String>,
        status: Status,
        kind: ErrorKind,
        error: impl Into<String>,
    ) -> Self {
        let mut metadata = JsonMap::new();
        metadata.insert("error_kind".to_string(), kind.as_str().into());

        Self {
            worker_id: worker_id.into(),
            task_id: task_id.into(),
            status,
            payload: JsonMap::new(),
            error: Some(error.into()),
            execution_time: Duration::ZERO,
            confidence: Confidence::ZERO,
            metadata,
            timestamp: Utc::now(),
        }
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn is_successful(&self) -> bool {
        self.status == Status::Success
    }

    /// The error message, if one is present and non-empty.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.metadata
            .get("error_kind")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

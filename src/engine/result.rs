// ABOUTME: Workflow run result types and aggregation of per-worker results
// ABOUTME: Computes overall status, mean confidence, and the collected error list

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::contract::WorkerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl std::fmt::Display for OrchestrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestrationStatus::Success => write!(f, "success"),
            OrchestrationStatus::PartialSuccess => write!(f, "partial_success"),
            OrchestrationStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub workflow_id: String,
    pub run_id: String,
    pub status: OrchestrationStatus,
    /// Final result per worker, in completion order.
    pub results: IndexMap<String, WorkerResult>,
    pub execution_time: Duration,
    pub overall_confidence: f64,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Why a run stopped before every step resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    RequiredStepFailed { step_id: String },
    WorkflowTimeout { timeout: Duration },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::RequiredStepFailed { step_id } => {
                write!(f, "required step {} failed, workflow aborted", step_id)
            }
            AbortReason::WorkflowTimeout { timeout } => {
                write!(f, "workflow timeout after {:?}", timeout)
            }
        }
    }
}

/// Mean confidence of successful results, 0 when none succeeded.
pub fn overall_confidence<'a>(results: impl IntoIterator<Item = &'a WorkerResult>) -> f64 {
    let (sum, count) = results
        .into_iter()
        .filter(|r| r.is_successful())
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.confidence.value(), count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// `"{worker_id}: {error}"` for every result carrying a non-empty error.
pub fn collect_errors<'a>(results: impl IntoIterator<Item = &'a WorkerResult>) -> Vec<String> {
    results
        .into_iter()
        .filter_map(|r| r.error_message().map(|e| format!("{}: {}", r.worker_id, e)))
        .collect()
}

impl OrchestrationResult {
    /// Aggregate one run from its per-step results, in completion order.
    /// Status, errors, and confidence count every step; `results` keeps the
    /// latest result per worker.
    pub fn aggregate(
        workflow_id: impl Into<String>,
        run_id: impl Into<String>,
        step_results: &IndexMap<String, WorkerResult>,
        execution_time: Duration,
        abort: Option<AbortReason>,
    ) -> Self {
        let overall_confidence = overall_confidence(step_results.values());
        let mut errors = collect_errors(step_results.values());

        let status = match &abort {
            Some(reason) => {
                errors.push(reason.to_string());
                OrchestrationStatus::Failed
            }
            None if errors.is_empty() => OrchestrationStatus::Success,
            None if step_results.values().any(WorkerResult::is_successful) => {
                OrchestrationStatus::PartialSuccess
            }
            None => OrchestrationStatus::Failed,
        };

        let results = step_results
            .values()
            .map(|result| (result.worker_id.clone(), result.clone()))
            .collect();

        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
            status,
            results,
            execution_time,
            overall_confidence,
            errors,
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OrchestrationStatus::Success
    }

    pub fn successful_workers(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| r.is_successful())
            .map(|r| r.worker_id.as_str())
            .collect()
    }

    pub fn failed_workers(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| !r.is_successful())
            .map(|r| r.worker_id.as_str())
            .collect()
    }
}

// ABOUTME: Builds the context handed to each step from the run context and upstream results
// ABOUTME: Upstream payloads are keyed by the producing worker's id

use indexmap::IndexMap;

use crate::contract::{JsonMap, WorkerResult};
use crate::workflow::WorkflowStep;

/// Results recorded so far in one run, keyed by step id.
#[derive(Debug, Default, Clone)]
pub struct ExecutionContext {
    base: JsonMap,
    step_results: IndexMap<String, WorkerResult>,
}

impl ExecutionContext {
    pub fn new(base: JsonMap) -> Self {
        Self {
            base,
            step_results: IndexMap::new(),
        }
    }

    pub fn base(&self) -> &JsonMap {
        &self.base
    }

    pub fn record(&mut self, step_id: impl Into<String>, result: WorkerResult) {
        self.step_results.insert(step_id.into(), result);
    }

    pub fn step_result(&self, step_id: &str) -> Option<&WorkerResult> {
        self.step_results.get(step_id)
    }

    pub fn step_results(&self) -> &IndexMap<String, WorkerResult> {
        &self.step_results
    }

    /// Base context plus `{dependency worker_id -> payload}` for each resolved dependency.
    /// Payloads shadow base keys of the same name.
    pub fn for_step(&self, step: &WorkflowStep) -> JsonMap {
        let mut context = self.base.clone();

        for dependency in &step.depends_on {
            if let Some(result) = self.step_results.get(dependency) {
                context.insert(
                    result.worker_id.clone(),
                    serde_json::Value::Object(result.payload.clone()),
                );
            }
        }

        context
    }
}

// ABOUTME: Registry of worker executors and workflow definitions
// ABOUTME: Populated at setup time and read-only while workflows execute

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::worker::WorkerExecutor;
use crate::workflow::Workflow;

#[derive(Debug, Default)]
pub struct Registry {
    workers: IndexMap<String, Arc<WorkerExecutor>>,
    workflows: IndexMap<String, Workflow>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an executor, returning the one it replaced.
    pub fn insert_worker(&mut self, executor: WorkerExecutor) -> Option<Arc<WorkerExecutor>> {
        let id = executor.id().to_string();
        let previous = self.workers.insert(id.clone(), Arc::new(executor));

        if previous.is_some() {
            warn!("Worker {} was already registered, replacing it", id);
        } else {
            info!("Registered worker: {}", id);
        }
        previous
    }

    pub fn worker(&self, id: &str) -> Option<&Arc<WorkerExecutor>> {
        self.workers.get(id)
    }

    pub fn contains_worker(&self, id: &str) -> bool {
        self.workers.contains_key(id)
    }

    /// Registered worker ids in registration order.
    pub fn worker_ids(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }

    pub fn workers(&self) -> impl Iterator<Item = &Arc<WorkerExecutor>> {
        self.workers.values()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn insert_workflow(&mut self, workflow: Workflow) -> Option<Workflow> {
        let id = workflow.id.clone();
        let previous = self.workflows.insert(id.clone(), workflow);

        if previous.is_some() {
            warn!("Workflow {} was already registered, replacing it", id);
        } else {
            info!("Registered workflow: {}", id);
        }
        previous
    }

    pub fn workflow(&self, id: &str) -> Option<&Workflow> {
        self.workflows.get(id)
    }

    pub fn workflow_ids(&self) -> Vec<String> {
        self.workflows.keys().cloned().collect()
    }
}

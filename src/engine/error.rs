// ABOUTME: Error types for workflow orchestration
// ABOUTME: Graph errors are fatal to a whole run; step-level failures never surface here

use thiserror::Error;

use crate::registry::MessagingError;

/// Setup-time misuse that prevents a workflow from running at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Workflow {workflow_id} not found")]
    WorkflowNotFound { workflow_id: String },

    #[error("Worker '{worker_id}' required by step '{step_id}' is not registered")]
    WorkerNotFound { step_id: String, worker_id: String },

    #[error("Step '{step_id}' depends on unknown step '{dependency}'")]
    UnknownDependency { step_id: String, dependency: String },

    #[error("Circular dependency detected: {steps:?}")]
    CircularDependency { steps: Vec<String> },

    #[error("Duplicate step id: {step_id}")]
    DuplicateStep { step_id: String },

    #[error("Workflow {workflow_id} has no steps")]
    EmptyWorkflow { workflow_id: String },

    #[error("No step is ready but {pending:?} have not run")]
    Stalled { pending: Vec<String> },
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
}

impl OrchestratorError {
    pub fn is_graph_error(&self) -> bool {
        matches!(self, OrchestratorError::Graph(_))
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

// ABOUTME: Main library module for the agent orchestrator
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod contract;
pub mod engine;
pub mod registry;
pub mod worker;
pub mod workflow;

// Re-export commonly used types
pub use contract::{Confidence, JsonMap, Message, Priority, Status, Task, WorkerResult};
pub use engine::{
    GraphError, OrchestrationResult, OrchestrationStatus, Orchestrator, OrchestratorError,
    OrchestratorSettings,
};
pub use registry::Mailbox;
pub use worker::{Worker, WorkerError, WorkerOutput, WorkerProfile, WorkerStatus};
pub use workflow::{Workflow, WorkflowStep};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ABOUTME: Workflow orchestration engine
// ABOUTME: Dependency planning, retry scheduling, context propagation, and result aggregation

pub mod context;
pub mod dependency;
pub mod error;
pub mod orchestrator;
pub mod result;
pub mod scheduler;

pub use context::ExecutionContext;
pub use dependency::{DependencyGraph, ExecutionPlan};
pub use error::{GraphError, OrchestratorError, Result};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use result::{AbortReason, OrchestrationResult, OrchestrationStatus};
pub use scheduler::{run_with_retry, BackoffSettings, RetryPolicy, StepOutcome};

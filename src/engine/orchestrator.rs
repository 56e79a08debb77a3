// ABOUTME: Orchestrator that executes workflows across registered workers
// ABOUTME: Runs dependency waves concurrently or steps sequentially, and exposes status and messaging

use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::context::ExecutionContext;
use super::dependency::{DependencyGraph, ExecutionPlan};
use super::error::{GraphError, Result};
use super::result::{AbortReason, OrchestrationResult};
use super::scheduler::{run_with_retry, BackoffSettings, RetryPolicy, StepOutcome};
use crate::contract::{JsonMap, Message, Task, WorkerResult};
use crate::registry::{Mailbox, MessagingError, Registry};
use crate::worker::{ExecutorSettings, Worker, WorkerExecutor, WorkerProfile, WorkerStatus};
use crate::workflow::{Workflow, WorkflowStep};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub orchestrator_id: String,
    pub executor: ExecutorSettings,
    pub backoff: BackoffSettings,
    pub execution_history_capacity: usize,
    pub mailbox_capacity: usize,
    /// Steps dispatched at once across all runs; zero is treated as one.
    pub max_concurrent: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            orchestrator_id: "orchestrator".to_string(),
            executor: ExecutorSettings::default(),
            backoff: BackoffSettings::default(),
            execution_history_capacity: 100,
            mailbox_capacity: 256,
            max_concurrent: 8,
        }
    }
}

type Executors<'a> = HashMap<&'a str, Arc<WorkerExecutor>>;

pub struct Orchestrator {
    settings: OrchestratorSettings,
    registry: Registry,
    history: RwLock<VecDeque<OrchestrationResult>>,
    permits: Semaphore,
}

impl Orchestrator {
    pub fn new(settings: OrchestratorSettings) -> Self {
        info!(
            "Orchestrator {} initialized (max {} concurrent steps)",
            settings.orchestrator_id, settings.max_concurrent
        );
        let permits = Semaphore::new(settings.max_concurrent.max(1));
        Self {
            settings,
            registry: Registry::new(),
            history: RwLock::new(VecDeque::new()),
            permits,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a worker with a fresh mailbox and return a handle to it.
    pub fn register_worker(&mut self, profile: WorkerProfile, worker: Arc<dyn Worker>) -> Mailbox {
        let mailbox = Mailbox::new(self.settings.mailbox_capacity);
        self.register_worker_with_mailbox(profile, worker, mailbox.clone());
        mailbox
    }

    /// Register a worker that already holds its own mailbox handle.
    /// A disabled profile is skipped, so steps naming it fail validation.
    pub fn register_worker_with_mailbox(
        &mut self,
        profile: WorkerProfile,
        worker: Arc<dyn Worker>,
        mailbox: Mailbox,
    ) {
        if !profile.enabled {
            info!("Worker {} is disabled, not registering", profile.id);
            return;
        }

        let executor = WorkerExecutor::new(profile, worker, self.settings.executor.clone(), mailbox);
        self.registry.insert_worker(executor);
    }

    pub fn register_workflow(&mut self, workflow: Workflow) {
        self.registry.insert_workflow(workflow);
    }

    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.registry.workflow(workflow_id)
    }

    /// Full graph validation against the registered workers.
    pub fn validate_workflow(&self, workflow: &Workflow) -> std::result::Result<ExecutionPlan, GraphError> {
        if workflow.steps.is_empty() {
            return Err(GraphError::EmptyWorkflow {
                workflow_id: workflow.id.clone(),
            });
        }

        for step in &workflow.steps {
            if !self.registry.contains_worker(&step.worker_id) {
                return Err(GraphError::WorkerNotFound {
                    step_id: step.step_id.clone(),
                    worker_id: step.worker_id.clone(),
                });
            }
        }

        DependencyGraph::from_workflow(workflow)?.create_execution_plan()
    }

    fn resolve_executors<'a>(&self, workflow: &'a Workflow) -> std::result::Result<Executors<'a>, GraphError> {
        workflow
            .steps
            .iter()
            .map(|step| {
                self.registry
                    .worker(&step.worker_id)
                    .map(|executor| (step.step_id.as_str(), Arc::clone(executor)))
                    .ok_or_else(|| GraphError::WorkerNotFound {
                        step_id: step.step_id.clone(),
                        worker_id: step.worker_id.clone(),
                    })
            })
            .collect()
    }

    /// Execute a registered workflow. Graph problems are returned before any
    /// step is dispatched; step failures are folded into the result.
    #[instrument(skip(self, context), fields(orchestrator = %self.settings.orchestrator_id))]
    pub async fn execute_workflow(&self, workflow_id: &str, context: JsonMap) -> Result<OrchestrationResult> {
        let workflow = self
            .registry
            .workflow(workflow_id)
            .ok_or_else(|| GraphError::WorkflowNotFound {
                workflow_id: workflow_id.to_string(),
            })?;

        let plan = self.validate_workflow(workflow)?;
        let executors = self.resolve_executors(workflow)?;
        let run_id = uuid::Uuid::new_v4().to_string();

        info!(
            "Starting workflow {} (run {}): {} steps in {} waves, {} mode",
            workflow.id,
            run_id,
            plan.total_steps,
            plan.execution_depth(),
            if workflow.parallel { "parallel" } else { "sequential" }
        );

        let start_time = Instant::now();
        let deadline = start_time + workflow.timeout;

        let (execution, abort) = if workflow.parallel {
            self.run_parallel(workflow, &executors, context, deadline).await?
        } else {
            self.run_sequential(workflow, &executors, context, deadline).await
        };

        let result = OrchestrationResult::aggregate(
            workflow.id.clone(),
            run_id,
            execution.step_results(),
            start_time.elapsed(),
            abort,
        );

        info!(
            "Workflow {} finished with status {} in {:?} (confidence {:.3})",
            result.workflow_id, result.status, result.execution_time, result.overall_confidence
        );
        for message in &result.errors {
            debug!("Workflow {} error: {}", result.workflow_id, message);
        }

        self.record_history(result.clone()).await;
        Ok(result)
    }

    async fn run_parallel(
        &self,
        workflow: &Workflow,
        executors: &Executors<'_>,
        context: JsonMap,
        deadline: Instant,
    ) -> Result<(ExecutionContext, Option<AbortReason>)> {
        let graph = DependencyGraph::from_workflow(workflow)?;
        let mut execution = ExecutionContext::new(context);
        let mut resolved = HashSet::new();
        let mut wave_number = 0;

        while resolved.len() < workflow.steps.len() {
            let wave = graph.ready_wave(&resolved);
            if wave.is_empty() {
                return Err(GraphError::Stalled {
                    pending: graph.pending_steps(&resolved),
                }
                .into());
            }

            wave_number += 1;
            info!(
                "Executing wave {} with {} steps: {:?}",
                wave_number,
                wave.len(),
                wave.iter().map(|s| s.step_id.as_str()).collect::<Vec<_>>()
            );

            let futures = wave.iter().map(|step| {
                let step_context = execution.for_step(step);
                let executor = &executors[step.step_id.as_str()];
                timeout_at(deadline, self.run_step_bounded(step, executor, step_context))
            });
            let outcomes = join_all(futures).await;

            let mut abort = None;
            for (step, outcome) in wave.iter().zip(outcomes) {
                let Ok(outcome) = outcome else {
                    warn!("Step {} cut off by workflow timeout", step.step_id);
                    abort = Some(AbortReason::WorkflowTimeout {
                        timeout: workflow.timeout,
                    });
                    continue;
                };

                resolved.insert(step.step_id.clone());
                let failed = !outcome.result.is_successful();
                execution.record(step.step_id.clone(), outcome.result);

                if failed && step.is_required() {
                    error!("Required step {} failed", step.step_id);
                    if abort.is_none() {
                        abort = Some(AbortReason::RequiredStepFailed {
                            step_id: step.step_id.clone(),
                        });
                    }
                } else if failed {
                    warn!("Optional step {} failed, continuing", step.step_id);
                }
            }

            if abort.is_some() {
                return Ok((execution, abort));
            }
        }

        Ok((execution, None))
    }

    async fn run_sequential(
        &self,
        workflow: &Workflow,
        executors: &Executors<'_>,
        context: JsonMap,
        deadline: Instant,
    ) -> (ExecutionContext, Option<AbortReason>) {
        let mut execution = ExecutionContext::new(context);

        for step in &workflow.steps {
            let step_context = execution.for_step(step);
            let run = self.run_step_bounded(step, &executors[step.step_id.as_str()], step_context);

            let Ok(outcome) = timeout_at(deadline, run).await else {
                warn!("Step {} cut off by workflow timeout", step.step_id);
                return (
                    execution,
                    Some(AbortReason::WorkflowTimeout {
                        timeout: workflow.timeout,
                    }),
                );
            };

            let failed = !outcome.result.is_successful();
            execution.record(step.step_id.clone(), outcome.result);

            if failed && step.is_required() {
                error!("Required step {} failed, stopping workflow", step.step_id);
                return (
                    execution,
                    Some(AbortReason::RequiredStepFailed {
                        step_id: step.step_id.clone(),
                    }),
                );
            } else if failed {
                warn!("Optional step {} failed, continuing", step.step_id);
            }
        }

        (execution, None)
    }

    async fn run_step(&self, step: &WorkflowStep, executor: &WorkerExecutor, context: JsonMap) -> StepOutcome {
        let task = Task::new(step.step_id.clone(), step.action.clone())
            .with_parameters(step.parameters.clone())
            .with_context(context)
            .with_priority(executor.profile().priority);
        let policy = RetryPolicy::for_step(step, self.settings.backoff);

        let mut outcome = run_with_retry(executor, task, &policy).await;
        outcome.result.add_metadata("step_id", step.step_id.clone());
        outcome.result.add_metadata("attempts", outcome.attempts);
        outcome
    }

    /// Wait for a concurrency permit, then run the step. The permit is held
    /// across retries and released when the step resolves.
    async fn run_step_bounded(
        &self,
        step: &WorkflowStep,
        executor: &WorkerExecutor,
        context: JsonMap,
    ) -> StepOutcome {
        // Never closed; a failed acquire would run the step unbounded.
        let _permit = self.permits.acquire().await.ok();
        debug!(
            "Step {} acquired a permit ({} left)",
            step.step_id,
            self.permits.available_permits()
        );
        self.run_step(step, executor, context).await
    }

    async fn record_history(&self, result: OrchestrationResult) {
        let mut history = self.history.write().await;
        history.push_back(result);

        while history.len() > self.settings.execution_history_capacity.max(1) {
            history.pop_front();
        }
    }

    /// Run the same goal on several workers at once, one attempt each, under
    /// the same concurrency cap as workflow steps. Unknown ids are skipped and
    /// repeated ids are dispatched once.
    pub async fn coordinate<S: AsRef<str>>(
        &self,
        worker_ids: &[S],
        goal: &str,
        context: JsonMap,
    ) -> IndexMap<String, WorkerResult> {
        info!("Coordinating {} workers for goal: {}", worker_ids.len(), goal);

        let mut parameters = JsonMap::new();
        parameters.insert("goal".to_string(), goal.into());
        let stamp = chrono::Utc::now().timestamp_micros();

        let mut selected: IndexMap<&str, Arc<WorkerExecutor>> = IndexMap::new();
        for id in worker_ids {
            let id = id.as_ref();
            if selected.contains_key(id) {
                debug!("Worker {} listed more than once, dispatching once", id);
                continue;
            }
            match self.registry.worker(id) {
                Some(executor) => {
                    selected.insert(id, Arc::clone(executor));
                }
                None => warn!("Worker {} not found, skipping", id),
            }
        }

        let futures = selected.values().map(|executor| {
            let task = Task::new(format!("{}_{}", executor.id(), stamp), "coordinate")
                .with_parameters(parameters.clone())
                .with_context(context.clone())
                .with_priority(executor.profile().priority);
            async move {
                let _permit = self.permits.acquire().await.ok();
                executor.process(task).await
            }
        });
        let results = join_all(futures).await;

        selected
            .values()
            .zip(results)
            .map(|(executor, result)| (executor.id().to_string(), result))
            .collect()
    }

    pub async fn get_status(&self, worker_id: &str) -> Option<WorkerStatus> {
        match self.registry.worker(worker_id) {
            Some(executor) => Some(executor.status().await),
            None => None,
        }
    }

    pub async fn get_all_status(&self) -> BTreeMap<String, WorkerStatus> {
        let mut statuses = BTreeMap::new();
        for executor in self.registry.workers() {
            statuses.insert(executor.id().to_string(), executor.status().await);
        }
        statuses
    }

    /// The most recent `limit` workflow runs, oldest first.
    pub async fn get_history(&self, limit: usize) -> Vec<OrchestrationResult> {
        let history = self.history.read().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn mailbox(&self, worker_id: &str) -> Option<&Mailbox> {
        self.registry.worker(worker_id).map(|executor| executor.mailbox())
    }

    /// Deliver a message to its receiver's mailbox without waiting.
    pub fn send_message(&self, message: Message) -> Result<()> {
        let mailbox = self
            .mailbox(&message.receiver_id)
            .ok_or_else(|| MessagingError::UnknownReceiver {
                receiver_id: message.receiver_id.clone(),
            })?;
        mailbox.send(message)?;
        Ok(())
    }

    pub async fn receive_message(
        &self,
        worker_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Message>> {
        let mailbox = self
            .mailbox(worker_id)
            .ok_or_else(|| MessagingError::UnknownReceiver {
                receiver_id: worker_id.to_string(),
            })?;
        Ok(mailbox.receive(timeout).await)
    }

    /// Send a copy to each target (every registered worker when `None`), except
    /// the sender. Returns how many mailboxes accepted the message.
    pub fn broadcast_message(
        &self,
        sender_id: &str,
        message_type: &str,
        payload: JsonMap,
        targets: Option<&[String]>,
    ) -> usize {
        let targets = match targets {
            Some(ids) => ids.to_vec(),
            None => self.registry.worker_ids(),
        };

        let mut delivered = 0;
        for target in targets.iter().filter(|id| id.as_str() != sender_id) {
            let message = Message::new(sender_id, target.clone(), message_type, payload.clone());
            match self.send_message(message) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast from {} to {} failed: {}", sender_id, target, e),
            }
        }

        debug!("Broadcast {} delivered to {} workers", message_type, delivered);
        delivered
    }

    /// Clear a worker's attempt history. Returns false for an unknown id.
    pub async fn reset_worker(&self, worker_id: &str) -> bool {
        match self.registry.worker(worker_id) {
            Some(executor) => {
                executor.reset().await;
                true
            }
            None => false,
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorSettings::default())
    }
}


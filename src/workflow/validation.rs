// ABOUTME: Workflow validation collecting every structural problem in one pass
// ABOUTME: Reports graph errors plus warnings for legal but surprising definitions

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::definition::Workflow;
use crate::engine::{DependencyGraph, ExecutionPlan, GraphError};

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<GraphError>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
    /// Present when the graph is sound.
    pub plan: Option<ExecutionPlan>,
}

impl ValidationReport {
    fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct WorkflowValidator {
    known_workers: Option<HashSet<String>>,
}

impl WorkflowValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report steps naming a worker outside this set.
    pub fn with_known_workers<I, S>(mut self, workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_workers = Some(workers.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self, workflow: &Workflow) -> ValidationReport {
        let mut report = ValidationReport::new();

        if workflow.steps.is_empty() {
            report.errors.push(GraphError::EmptyWorkflow {
                workflow_id: workflow.id.clone(),
            });
        }

        self.check_steps(workflow, &mut report);

        // Graph checks only make sense once ids and references are sound.
        if report.errors.is_empty() {
            match DependencyGraph::from_workflow(workflow).and_then(|g| {
                let plan = g.create_execution_plan()?;
                Ok((plan, g.is_declaration_order_valid()))
            }) {
                Ok((plan, ordered)) => {
                    if !workflow.parallel && !ordered {
                        report.warnings.push(
                            "Sequential workflow declares a step before one of its dependencies; \
                             that dependency's output will be missing from the step context"
                                .to_string(),
                        );
                    }
                    report.plan = Some(plan);
                }
                Err(error) => report.errors.push(error),
            }
        }

        self.check_warnings(workflow, &mut report);

        report.is_valid = report.errors.is_empty();
        report
    }

    fn check_steps(&self, workflow: &Workflow, report: &mut ValidationReport) {
        let step_ids: HashSet<&str> = workflow.steps.iter().map(|s| s.step_id.as_str()).collect();
        let mut seen = HashSet::new();

        for step in &workflow.steps {
            if !seen.insert(step.step_id.as_str()) {
                report.errors.push(GraphError::DuplicateStep {
                    step_id: step.step_id.clone(),
                });
            }

            for dependency in &step.depends_on {
                if !step_ids.contains(dependency.as_str()) {
                    report.errors.push(GraphError::UnknownDependency {
                        step_id: step.step_id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }

            if let Some(known) = &self.known_workers {
                if !known.contains(&step.worker_id) {
                    report.errors.push(GraphError::WorkerNotFound {
                        step_id: step.step_id.clone(),
                        worker_id: step.worker_id.clone(),
                    });
                }
            }
        }
    }

    fn check_warnings(&self, workflow: &Workflow, report: &mut ValidationReport) {
        if workflow.timeout == Duration::ZERO {
            report
                .warnings
                .push("Workflow timeout is zero; every run will time out".to_string());
        }

        let mut steps_by_worker: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in &workflow.steps {
            steps_by_worker
                .entry(step.worker_id.as_str())
                .or_default()
                .push(step.step_id.as_str());
        }

        for step in &workflow.steps {
            let Some(steps) = steps_by_worker.remove(step.worker_id.as_str()) else {
                continue;
            };
            if steps.len() > 1 {
                report.warnings.push(format!(
                    "Worker '{}' runs steps {:?}; only the last result is kept in the run results",
                    step.worker_id, steps
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{complete_analysis_workflow, WorkflowStep};

    #[test]
    fn test_complete_analysis_is_valid() {
        let workflow = complete_analysis_workflow();
        let report = WorkflowValidator::new()
            .with_known_workers(workflow.worker_ids())
            .validate(&workflow);

        assert!(report.is_valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.plan.unwrap().total_steps, 8);
    }

    #[test]
    fn test_collects_every_reference_error() {
        let workflow = Workflow::new("broken", "Broken")
            .with_step(WorkflowStep::new("a", "sales_agent", "ingest").depends_on(["ghost"]))
            .with_step(WorkflowStep::new("b", "nobody", "run").depends_on(["phantom"]));

        let report = WorkflowValidator::new()
            .with_known_workers(["sales_agent"])
            .validate(&workflow);

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 3);
        assert!(report.plan.is_none());
        assert!(report
            .errors
            .contains(&GraphError::WorkerNotFound {
                step_id: "b".to_string(),
                worker_id: "nobody".to_string()
            }));
    }

    #[test]
    fn test_cycle_reported() {
        let workflow = Workflow::new("cycle", "Cycle")
            .with_step(WorkflowStep::new("a", "w1", "run").depends_on(["b"]))
            .with_step(WorkflowStep::new("b", "w2", "run").depends_on(["a"]));

        let report = WorkflowValidator::new().validate(&workflow);

        assert!(!report.is_valid);
        assert!(matches!(
            report.errors[0],
            GraphError::CircularDependency { .. }
        ));
    }

    #[test]
    fn test_warnings() {
        let workflow = Workflow::new("warn", "Warn")
            .sequential()
            .with_step(WorkflowStep::new("b", "w1", "run").depends_on(["a"]))
            .with_step(WorkflowStep::new("a", "w1", "run"));

        let report = WorkflowValidator::new().validate(&workflow);

        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 2);
    }
}

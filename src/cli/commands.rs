// ABOUTME: Command implementations for the orchestrator CLI
// ABOUTME: Handles execution of run, validate, and init commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::args::Args;
use super::config::Config;
use crate::engine::{OrchestrationResult, OrchestrationStatus, Orchestrator};
use crate::worker::{StaticWorker, StaticWorkerConfig};
use crate::workflow::{complete_analysis_workflow, Workflow, WorkflowValidator};

/// Build an orchestrator with one static worker per worker id the workflow uses.
/// Ids missing from the config get a default worker that echoes its action;
/// workers the config disables stay unregistered.
pub fn build_orchestrator(workflow: &Workflow, config: &Config) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(config.orchestrator_settings());

    for worker_id in workflow.worker_ids() {
        let worker_config = match config.worker(&worker_id) {
            Some(configured) => configured.clone(),
            None => {
                warn!("No worker configured for {}, using a default static worker", worker_id);
                StaticWorkerConfig::new(worker_id.clone())
            }
        };

        let profile = worker_config.profile();
        orchestrator.register_worker(profile, Arc::new(StaticWorker::new(worker_config)));
    }

    orchestrator.register_workflow(workflow.clone());
    orchestrator
}

/// Execute a workflow command
pub async fn run_workflow(
    workflow_path: PathBuf,
    vars: Vec<String>,
    output: Option<PathBuf>,
    sequential: bool,
    config: &Config,
) -> Result<()> {
    info!("Starting workflow execution: {}", workflow_path.display());

    let context = Args::parse_context(&vars)?;
    info!("Parsed {} context values", context.len());

    let mut workflow = Workflow::from_file(&workflow_path)
        .with_context(|| format!("Failed to load workflow {}", workflow_path.display()))?;
    if sequential {
        workflow.parallel = false;
    }
    info!("Loaded workflow: {}", workflow.name);

    let orchestrator = build_orchestrator(&workflow, config);
    let result = orchestrator
        .execute_workflow(&workflow.id, context)
        .await
        .map_err(|e| anyhow::anyhow!("Workflow execution failed: {}", e))?;

    match output {
        Some(output_path) => {
            write_result(&result, &output_path)?;
            info!("Results written to: {}", output_path.display());
        }
        None => print_summary(&result),
    }

    match result.status {
        OrchestrationStatus::Success => Ok(()),
        status => Err(anyhow::anyhow!(
            "Workflow execution finished with status: {}",
            status
        )),
    }
}

fn write_result(result: &OrchestrationResult, path: &Path) -> Result<()> {
    let json_content = serde_json::to_string_pretty(result)
        .context("Failed to serialize results to JSON")?;
    std::fs::write(path, json_content)
        .with_context(|| format!("Failed to write output file '{}'", path.display()))?;
    Ok(())
}

fn print_summary(result: &OrchestrationResult) {
    println!(
        "Workflow '{}' completed with status: {}",
        result.workflow_id, result.status
    );
    println!(
        "  Run: {}  Time: {:?}  Confidence: {:.3}",
        result.run_id, result.execution_time, result.overall_confidence
    );

    for (worker_id, worker_result) in &result.results {
        println!(
            "  {}: {} ({:?})",
            worker_id, worker_result.status, worker_result.execution_time
        );
    }

    for error in &result.errors {
        println!("  error: {}", error);
    }
}

/// Validate a workflow file and print its execution waves
pub async fn validate_workflow(workflow_path: PathBuf, config: &Config) -> Result<()> {
    info!("Validating workflow: {}", workflow_path.display());

    let workflow = Workflow::from_file(&workflow_path)
        .map_err(|e| anyhow::anyhow!("Workflow validation failed: {}", e))?;

    let mut validator = WorkflowValidator::new();
    if !config.workers.is_empty() {
        validator = validator.with_known_workers(
            config
                .workers
                .iter()
                .filter(|w| w.enabled)
                .map(|w| w.id.clone()),
        );
    }
    let report = validator.validate(&workflow);

    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }

    if !report.is_valid {
        for error in &report.errors {
            println!("  error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Workflow validation failed with {} error(s)",
            report.errors.len()
        ));
    }

    println!("✓ Workflow '{}' is valid", workflow.name);
    println!("  Steps: {}", workflow.steps.len());
    println!(
        "  Mode: {}",
        if workflow.parallel { "parallel" } else { "sequential" }
    );
    if let Some(plan) = &report.plan {
        for (index, wave) in plan.waves.iter().enumerate() {
            println!("  Wave {}: {}", index + 1, wave.join(", "));
        }
    }

    info!("Workflow validation completed successfully");
    Ok(())
}

/// Write the complete analysis workflow plus a worker config next to it
pub async fn init_workflow(name: String, output_dir: PathBuf) -> Result<()> {
    info!("Initializing workflow '{}' in {}", name, output_dir.display());

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
    }

    let workflow_file = output_dir.join(format!("{}.yaml", name));
    if workflow_file.exists() {
        return Err(anyhow::anyhow!(
            "Workflow file already exists: {}",
            workflow_file.display()
        ));
    }

    let mut workflow = complete_analysis_workflow();
    workflow.id = name;
    workflow.save_to_file(&workflow_file)?;
    info!("Created workflow file: {}", workflow_file.display());

    let config_file = output_dir.join("orchestrator.yaml");
    if config_file.exists() {
        info!("Keeping existing config: {}", config_file.display());
    } else {
        let config = Config {
            workers: workflow
                .worker_ids()
                .into_iter()
                .map(StaticWorkerConfig::new)
                .collect(),
            ..Config::default()
        };
        std::fs::write(&config_file, serde_yaml::to_string(&config)?)?;
        info!("Created config file: {}", config_file.display());
    }

    Ok(())
}

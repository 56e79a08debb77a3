// ABOUTME: Core workflow data structures and YAML parsing
// ABOUTME: Defines Workflow and WorkflowStep with defaults, builders, and structural checks

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use super::error::{Result, WorkflowError};
use crate::contract::JsonMap;
use crate::engine::GraphError;

fn default_retry_on_failure() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_parallel() -> bool {
    true
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step_id: String,
    pub worker_id: String,
    pub action: String,
    #[serde(default)]
    pub parameters: JsonMap,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_retry_on_failure")]
    pub retry_on_failure: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<WorkflowStep>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl WorkflowStep {
    pub fn new(
        step_id: impl Into<String>,
        worker_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            worker_id: worker_id.into(),
            action: action.into(),
            parameters: JsonMap::new(),
            depends_on: Vec::new(),
            optional: false,
            retry_on_failure: default_retry_on_failure(),
            max_retries: default_max_retries(),
        }
    }

    pub fn depends_on<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameters(mut self, parameters: JsonMap) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry_on_failure = true;
        self.max_retries = max_retries;
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.retry_on_failure = false;
        self
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            steps: Vec::new(),
            parallel: default_parallel(),
            timeout: default_timeout(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse workflow from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(WorkflowError::IoError)?;
        Self::from_yaml(&content)
    }

    /// Parse workflow from YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let workflow: Workflow = serde_yaml::from_str(content).map_err(WorkflowError::YamlError)?;
        workflow.validate_structure()?;
        Ok(workflow)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(WorkflowError::YamlError)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path.as_ref(), yaml).map_err(WorkflowError::IoError)?;
        Ok(())
    }

    /// Checks that do not need the dependency graph: names, emptiness, duplicates.
    pub fn validate_structure(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(WorkflowError::MissingField("id".to_string()));
        }

        if self.name.trim().is_empty() {
            return Err(WorkflowError::MissingField("name".to_string()));
        }

        if self.steps.is_empty() {
            return Err(GraphError::EmptyWorkflow {
                workflow_id: self.id.clone(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.step_id.trim().is_empty() {
                return Err(WorkflowError::MissingField("step_id".to_string()));
            }
            if step.worker_id.trim().is_empty() {
                return Err(WorkflowError::MissingField(format!(
                    "worker_id (step '{}')",
                    step.step_id
                )));
            }
            if !seen.insert(step.step_id.as_str()) {
                return Err(GraphError::DuplicateStep {
                    step_id: step.step_id.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub fn step_ids(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.step_id.clone()).collect()
    }

    pub fn get_step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn has_step(&self, step_id: &str) -> bool {
        self.get_step(step_id).is_some()
    }

    /// Distinct worker ids in declaration order.
    pub fn worker_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.steps
            .iter()
            .filter(|s| seen.insert(s.worker_id.as_str()))
            .map(|s| s.worker_id.clone())
            .collect()
    }

    pub fn get_dependent_steps(&self, step_id: &str) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.depends_on.iter().any(|d| d == step_id))
            .map(|s| s.step_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_with_defaults() {
        let yaml = r#"
id: restock
name: Restock Check
steps:
  - step_id: forecast
    worker_id: forecast_agent
    action: forecast
  - step_id: supply
    worker_id: supply_agent
    action: check
    depends_on: [forecast]
    optional: true
    max_retries: 1
"#;

        let workflow = Workflow::from_yaml(yaml).unwrap();

        assert!(workflow.parallel);
        assert_eq!(workflow.timeout, Duration::from_secs(300));
        assert_eq!(workflow.steps.len(), 2);

        let forecast = workflow.get_step("forecast").unwrap();
        assert!(forecast.retry_on_failure);
        assert_eq!(forecast.max_retries, 3);
        assert!(forecast.is_required());

        let supply = workflow.get_step("supply").unwrap();
        assert!(supply.optional);
        assert_eq!(supply.max_retries, 1);
        assert_eq!(workflow.get_dependent_steps("forecast"), vec!["supply"]);
    }

    #[test]
    fn test_parse_timeout_and_mode() {
        let yaml = r#"
id: quick
name: Quick
parallel: false
timeout: 45s
steps:
  - step_id: a
    worker_id: sales_agent
    action: ingest
"#;
        let workflow = Workflow::from_yaml(yaml).unwrap();
        assert!(!workflow.parallel);
        assert_eq!(workflow.timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let workflow = Workflow::new("dup", "Duplicates")
            .with_step(WorkflowStep::new("a", "sales_agent", "ingest"))
            .with_step(WorkflowStep::new("a", "social_agent", "collect"));

        let error = workflow.validate_structure().unwrap_err();
        assert!(matches!(
            error,
            WorkflowError::Invalid(GraphError::DuplicateStep { .. })
        ));
    }

    #[test]
    fn test_empty_workflow_rejected() {
        let yaml = r#"
id: empty
name: Empty
steps: []
"#;
        let error = Workflow::from_yaml(yaml).unwrap_err();
        assert!(matches!(
            error,
            WorkflowError::Invalid(GraphError::EmptyWorkflow { .. })
        ));
    }

    #[test]
    fn test_missing_name_rejected() {
        let workflow =
            Workflow::new("w", " ").with_step(WorkflowStep::new("a", "sales_agent", "ingest"));
        assert!(matches!(
            workflow.validate_structure(),
            Err(WorkflowError::MissingField(_))
        ));
    }

    #[test]
    fn test_worker_ids_are_distinct() {
        let workflow = Workflow::new("w", "W")
            .with_step(WorkflowStep::new("a", "sales_agent", "ingest"))
            .with_step(WorkflowStep::new("b", "sales_agent", "summarize"))
            .with_step(WorkflowStep::new("c", "risk_agent", "analyze"));

        assert_eq!(workflow.worker_ids(), vec!["sales_agent", "risk_agent"]);
    }

    #[test]
    fn test_file_round_trip() {
        let workflow = Workflow::new("w", "W")
            .with_timeout(Duration::from_secs(90))
            .with_step(WorkflowStep::new("a", "sales_agent", "ingest").without_retry());

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(workflow.to_yaml().unwrap().as_bytes()).unwrap();

        let loaded = Workflow::from_file(file.path()).unwrap();
        assert_eq!(loaded, workflow);
    }
}

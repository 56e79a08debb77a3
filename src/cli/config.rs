// ABOUTME: Configuration management for the orchestrator CLI
// ABOUTME: Loads settings from YAML files and ORCHESTRATOR_* environment variables

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{BackoffSettings, OrchestratorSettings};
use crate::worker::{ExecutorSettings, StaticWorkerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub orchestrator_id: String,

    /// Per-attempt limit when a task carries no deadline.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    pub worker_history_capacity: usize,

    pub execution_history_capacity: usize,

    pub mailbox_capacity: usize,

    /// Steps dispatched at once across a run.
    pub max_concurrent: usize,

    #[serde(with = "humantime_serde")]
    pub backoff_unit: Duration,

    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    pub logging: LoggingConfig,

    pub workers: Vec<StaticWorkerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orchestrator_id: "orchestrator".to_string(),
            default_timeout: Duration::from_secs(30),
            worker_history_capacity: 1000,
            execution_history_capacity: 100,
            mailbox_capacity: 256,
            max_concurrent: 8,
            backoff_unit: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
            logging: LoggingConfig::default(),
            workers: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };

        config.merge_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Working directory first, then `~/.orchestrator/config.yaml`.
    fn find_config_file() -> Option<PathBuf> {
        let local = [
            PathBuf::from("orchestrator.yaml"),
            PathBuf::from("orchestrator.yml"),
            PathBuf::from(".orchestrator.yaml"),
        ];

        if let Some(path) = local.into_iter().find(|p| p.exists()) {
            return Some(path);
        }

        dirs::home_dir()
            .map(|home| home.join(".orchestrator").join("config.yaml"))
            .filter(|p| p.exists())
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(level) = lookup("ORCHESTRATOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ORCHESTRATOR_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(secs) = lookup("ORCHESTRATOR_DEFAULT_TIMEOUT_SECS") {
            self.default_timeout = Duration::from_secs(secs.parse()?);
        }
        if let Some(capacity) = lookup("ORCHESTRATOR_HISTORY_CAPACITY") {
            self.worker_history_capacity = capacity.parse()?;
        }
        if let Some(limit) = lookup("ORCHESTRATOR_MAX_CONCURRENT") {
            self.max_concurrent = limit.parse()?;
        }
        if let Some(millis) = lookup("ORCHESTRATOR_BACKOFF_UNIT_MS") {
            self.backoff_unit = Duration::from_millis(millis.parse()?);
        }

        Ok(())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            orchestrator_id: self.orchestrator_id.clone(),
            executor: ExecutorSettings {
                default_timeout: self.default_timeout,
                history_capacity: self.worker_history_capacity,
            },
            backoff: BackoffSettings {
                unit: self.backoff_unit,
                max: self.max_backoff,
            },
            execution_history_capacity: self.execution_history_capacity,
            mailbox_capacity: self.mailbox_capacity,
            max_concurrent: self.max_concurrent,
        }
    }

    pub fn worker(&self, id: &str) -> Option<&StaticWorkerConfig> {
        self.workers.iter().find(|w| w.id == id)
    }
}

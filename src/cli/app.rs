// ABOUTME: Main application wiring for the orchestrator CLI
// ABOUTME: Installs the tracing subscriber, then dispatches to run, validate, or init

use anyhow::{anyhow, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Commands, Config, LoggingConfig};

pub struct App {
    config: Config,
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level
/// and `--verbose` forces `debug`. Unknown formats fall back to `pretty`.
fn install_subscriber(logging: &LoggingConfig, verbose: bool, no_color: bool) -> Result<String> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().with_ansi(!no_color).try_init(),
        _ => builder.pretty().with_ansi(!no_color).try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(level.to_string())
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let level = install_subscriber(&self.config.logging, verbose, no_color)?;
        debug!("Logging initialized at {} ({})", level, self.config.logging.format);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!(
            "Orchestrator {} v{} with {} configured workers",
            self.config.orchestrator_id,
            env!("CARGO_PKG_VERSION"),
            self.config.workers.len()
        );
        if let Some(path) = &args.config {
            debug!("Configuration file: {}", path.display());
        }

        match args.command {
            Commands::Run {
                workflow,
                vars,
                output,
                sequential,
                max_concurrent,
            } => {
                let mut config = self.config.clone();
                if let Some(limit) = max_concurrent {
                    config.max_concurrent = limit;
                }
                commands::run_workflow(workflow, vars, output, sequential, &config).await
            }
            Commands::Validate { workflow } => commands::validate_workflow(workflow, &self.config).await,
            Commands::Init { output_dir, name } => commands::init_workflow(name, output_dir).await,
        }
    }

    /// Parse the command line and load the configuration it points at.
    pub fn from_args() -> Result<(Self, Args)> {
        let args = Args::parse_args();
        let config = Config::load(args.config.clone())?;
        Ok((Self::new(config), args))
    }
}

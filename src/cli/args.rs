// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and the run, validate, and init subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::contract::JsonMap;

#[derive(Parser, Debug)]
#[command(name = "orchestrator")]
#[command(about = "Run dependency-driven workflows across analysis workers")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a workflow from a YAML file
    Run {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,

        #[arg(
            short = 'V',
            long = "var",
            help = "Add a value to the workflow context (key=value)"
        )]
        vars: Vec<String>,

        #[arg(short, long, help = "Write the run result as JSON to this file")]
        output: Option<PathBuf>,

        #[arg(long, help = "Run steps one at a time in declaration order")]
        sequential: bool,

        #[arg(long, help = "Maximum number of steps running at once")]
        max_concurrent: Option<usize>,
    },

    /// Validate a workflow file without executing
    Validate {
        #[arg(help = "Path to workflow YAML file")]
        workflow: PathBuf,
    },

    /// Write the complete analysis workflow and a matching worker config
    Init {
        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,

        #[arg(long, help = "Workflow id", default_value = "complete_analysis")]
        name: String,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse `key=value` pairs into a context map. Values that parse as JSON
    /// (numbers, booleans, arrays, objects) keep their type; anything else is a string.
    pub fn parse_context(vars: &[String]) -> anyhow::Result<JsonMap> {
        let mut context = JsonMap::new();

        for var in vars {
            let Some((key, value)) = var.split_once('=') else {
                return Err(anyhow::anyhow!(
                    "Invalid variable format '{}'. Expected 'key=value'",
                    var
                ));
            };

            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            context.insert(key.to_string(), value);
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_context() {
        let vars = vec![
            "product_id=SKU-42".to_string(),
            "horizon_days=30".to_string(),
            "include_social=true".to_string(),
        ];

        let parsed = Args::parse_context(&vars).unwrap();

        assert_eq!(parsed.get("product_id"), Some(&json!("SKU-42")));
        assert_eq!(parsed.get("horizon_days"), Some(&json!(30)));
        assert_eq!(parsed.get("include_social"), Some(&json!(true)));
    }

    #[test]
    fn test_parse_context_invalid() {
        let vars = vec!["invalid_format".to_string()];
        assert!(Args::parse_context(&vars).is_err());
    }

    #[test]
    fn test_run_arguments() {
        let args = Args::try_parse_from([
            "orchestrator",
            "run",
            "flow.yaml",
            "-V",
            "region=eu",
            "--sequential",
            "--output",
            "result.json",
            "--max-concurrent",
            "2",
        ])
        .unwrap();

        match args.command {
            Commands::Run {
                workflow,
                vars,
                output,
                sequential,
                max_concurrent,
            } => {
                assert_eq!(workflow, PathBuf::from("flow.yaml"));
                assert_eq!(vars, vec!["region=eu"]);
                assert_eq!(output, Some(PathBuf::from("result.json")));
                assert!(sequential);
                assert_eq!(max_concurrent, Some(2));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

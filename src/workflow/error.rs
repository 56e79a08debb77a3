// ABOUTME: Error types for loading and saving workflow definitions
// ABOUTME: Wraps IO and YAML failures together with structural graph errors

use thiserror::Error;

use crate::engine::GraphError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to read workflow file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid workflow: {0}")]
    Invalid(#[from] GraphError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

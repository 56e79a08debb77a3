// ABOUTME: Error types for task contract construction
// ABOUTME: Reports out-of-range priorities and confidences

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    #[error("Priority must be between 1 and 10, got {0}")]
    PriorityOutOfRange(u8),

    #[error("Confidence must be between 0.0 and 1.0, got {0}")]
    ConfidenceOutOfRange(f64),
}

pub type Result<T> = std::result::Result<T, ContractError>;

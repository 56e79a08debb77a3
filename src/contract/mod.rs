// ABOUTME: Task contract module shared between the orchestrator and its workers
// ABOUTME: Exports task, result, status, and message value types with validated ranges

pub mod error;
pub mod message;
pub mod result;
pub mod task;

pub use error::{ContractError, Result};
pub use message::Message;
pub use result::{Confidence, ErrorKind, Status, WorkerResult};
pub use task::{Priority, Task};

/// JSON object used for task parameters, shared context, payloads, and metadata.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

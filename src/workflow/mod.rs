// ABOUTME: Workflow definition module for declarative step graphs
// ABOUTME: Exports workflow and step types, YAML parsing, validation, and built-in templates

pub mod definition;
pub mod error;
pub mod templates;
pub mod validation;

pub use definition::{Workflow, WorkflowStep};
pub use error::{Result, WorkflowError};
pub use templates::complete_analysis_workflow;
pub use validation::{ValidationReport, WorkflowValidator};

// ABOUTME: Built-in workflow templates
// ABOUTME: The complete demand analysis pipeline from ingestion to explanation

use std::time::Duration;

use super::definition::{Workflow, WorkflowStep};

pub const COMPLETE_ANALYSIS_ID: &str = "complete_analysis";

/// Eight-step analysis: sales and social ingestion feed a forecast, which drives
/// supply, risk, and sustainability checks and a final explanation.
pub fn complete_analysis_workflow() -> Workflow {
    Workflow::new(COMPLETE_ANALYSIS_ID, "Complete Demand Analysis")
        .with_description("End-to-end analysis from data collection to explainable decisions")
        .with_timeout(Duration::from_secs(300))
        .with_step(WorkflowStep::new("collect_sales", "sales_agent", "ingest"))
        .with_step(WorkflowStep::new("collect_social", "social_agent", "collect"))
        .with_step(
            WorkflowStep::new("filter_signals", "signal_agent", "filter").depends_on(["collect_social"]),
        )
        .with_step(
            WorkflowStep::new("generate_forecast", "forecast_agent", "forecast")
                .depends_on(["collect_sales", "filter_signals"]),
        )
        .with_step(
            WorkflowStep::new("check_supply", "supply_agent", "check").depends_on(["generate_forecast"]),
        )
        .with_step(
            WorkflowStep::new("analyze_risk", "risk_agent", "analyze")
                .depends_on(["generate_forecast", "check_supply"]),
        )
        .with_step(
            WorkflowStep::new("calculate_sustainability", "sustainability_agent", "calculate")
                .depends_on(["check_supply"]),
        )
        .with_step(
            WorkflowStep::new("explain_decision", "xai_agent", "explain")
                .depends_on(["generate_forecast", "analyze_risk"]),
        )
}

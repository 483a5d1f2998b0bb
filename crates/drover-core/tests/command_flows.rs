//! End-to-end command flows: free text in, response contract out.
//!
//! Runs the whole service against scripted collaborators, covering the
//! chat scenarios the frontend depends on.

use async_trait::async_trait;
use std::sync::Arc;

use drover_core::analyst::Analyst;
use drover_core::dispatch::ActionDispatcher;
use drover_core::extract::{ExtractEngine, ExtractError, TieredExtractor};
use drover_core::risk::RiskScoringEngine;
use drover_core::service::CommandService;
use drover_gitlab::MockGitLab;
use drover_protocol::analytics::{
    CostAnalysis, FixSuggestion, OptimizationAnalysis, PipelineMetrics, TrendInsights,
};
use drover_protocol::commands::{ExtractionResult, Intent};
use drover_protocol::pipelines::TriggerOutcome;
use drover_protocol::prediction::PredictionInput;
use drover_warehouse::MockWarehouse;

/// Analyst that answers every question with the default payload.
struct StubAnalyst;

#[async_trait]
impl Analyst for StubAnalyst {
    async fn analyze_optimizations(
        &self,
        _project_path: &str,
    ) -> anyhow::Result<OptimizationAnalysis> {
        Ok(OptimizationAnalysis::default())
    }

    async fn optimize_pipeline(
        &self,
        _project_path: &str,
        _pipeline_id: &str,
        _optimization_kind: &str,
    ) -> anyhow::Result<OptimizationAnalysis> {
        Ok(OptimizationAnalysis::default())
    }

    async fn analyze_costs(&self, _project_path: &str) -> anyhow::Result<CostAnalysis> {
        Ok(CostAnalysis::default())
    }

    async fn analyze_failure(&self, _log: &str, _config: &str) -> anyhow::Result<FixSuggestion> {
        Ok(FixSuggestion::default())
    }

    async fn analyze_trends(&self, _metrics: &PipelineMetrics) -> anyhow::Result<TrendInsights> {
        Ok(TrendInsights {
            insights: vec!["Pipeline performance is stable".into()],
            ..TrendInsights::default()
        })
    }
}

/// Primary extraction tier that always fails, forcing the rules path.
struct BrokenModelTier;

#[async_trait]
impl ExtractEngine for BrokenModelTier {
    async fn extract(
        &self,
        _text: &str,
        _context: Option<&str>,
    ) -> Result<ExtractionResult, ExtractError> {
        Err(ExtractError::Model(anyhow::anyhow!("model unreachable")))
    }

    fn tier_name(&self) -> &str {
        "broken"
    }
}

struct Harness {
    gitlab: Arc<MockGitLab>,
    warehouse: Arc<MockWarehouse>,
    service: CommandService,
}

fn harness_with(gitlab: MockGitLab) -> Harness {
    let gitlab = Arc::new(gitlab);
    let warehouse = Arc::new(MockWarehouse::new());
    let risk = RiskScoringEngine::new(warehouse.clone());
    let dispatcher = ActionDispatcher::new(
        gitlab.clone(),
        warehouse.clone(),
        Arc::new(StubAnalyst),
        risk.clone(),
    );
    let service = CommandService::new(TieredExtractor::rules_only(), dispatcher, risk);
    Harness {
        gitlab,
        warehouse,
        service,
    }
}

fn harness() -> Harness {
    harness_with(MockGitLab::with_pipeline("42"))
}

#[tokio::test]
async fn deploy_feature_branch_to_staging() {
    let h = harness();
    let response = h
        .service
        .process_command("deploy feature-x to staging", Some("acme/widgets"))
        .await;

    assert_eq!(response.intent, Intent::DeployRequest);
    assert_eq!(response.action, "pipeline_triggered");
    assert!(response.executed);

    let calls = h.gitlab.trigger_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "acme/widgets");
    assert!(calls[0].ref_name.contains("feature-x"));
    let env = calls[0]
        .variables
        .iter()
        .find(|v| v.key == "ENVIRONMENT")
        .expect("ENVIRONMENT variable");
    assert_eq!(env.value, "staging");
}

#[tokio::test]
async fn status_check_uses_caller_context() {
    let h = harness();
    let response = h
        .service
        .process_command("check pipeline status", Some("acme/widgets"))
        .await;

    assert_eq!(response.intent, Intent::StatusCheck);
    assert!(response.executed);
    assert_eq!(h.gitlab.status_calls(), vec!["acme/widgets".to_string()]);
}

#[tokio::test]
async fn help_lists_deploy_to_staging() {
    let h = harness();
    let response = h.service.process_command("help", None).await;

    assert_eq!(response.intent, Intent::HelpRequest);
    assert!(response.executed);
    assert!(response.message.contains("deploy to staging"));
}

#[tokio::test]
async fn trigger_domain_error_surfaces_verbatim() {
    let gitlab = MockGitLab::new();
    gitlab.set_trigger(Ok(TriggerOutcome {
        pipeline: None,
        errors: vec!["branch not found".into()],
    }));
    let h = harness_with(gitlab);

    let response = h
        .service
        .process_command("deploy to staging", Some("acme/widgets"))
        .await;

    assert_eq!(response.action, "pipeline_error");
    assert_eq!(response.message, "branch not found");
    assert!(!response.executed);
}

#[tokio::test]
async fn deploy_without_any_project_is_rejected_before_gitlab() {
    let h = harness();
    let response = h.service.process_command("deploy to staging", None).await;

    assert_eq!(response.action, "error");
    assert!(!response.executed);
    assert_eq!(h.gitlab.trigger_calls().len(), 0);
}

#[tokio::test]
async fn auto_fix_with_clean_history_reports_no_failures() {
    let h = harness(); // mock default: no failed job
    let response = h
        .service
        .process_command("fix the failed job", Some("acme/widgets"))
        .await;

    assert_eq!(response.intent, Intent::AutoFix);
    assert_eq!(response.action, "no_failures");
    assert!(response.executed);
}

#[tokio::test]
async fn performance_report_combines_metrics_and_insights() {
    let h = harness();
    let response = h
        .service
        .process_command("show performance report for last week", Some("acme/widgets"))
        .await;

    assert_eq!(response.intent, Intent::PerformanceReport);
    assert!(response.executed);
    assert!(response.message.contains("Performance Report (last_7_days)"));
    assert!(response.message.contains("Pipeline Success Rate: 85%"));
    assert!(response.message.contains("Pipeline performance is stable"));

    let calls = h.warehouse.metrics_calls();
    assert_eq!(
        calls,
        vec![("acme/widgets".to_string(), "last_7_days".to_string())]
    );
}

#[tokio::test]
async fn broken_model_degrades_silently_to_rules() {
    let gitlab = Arc::new(MockGitLab::with_pipeline("7"));
    let warehouse = Arc::new(MockWarehouse::new());
    let risk = RiskScoringEngine::new(warehouse.clone());
    let dispatcher =
        ActionDispatcher::new(gitlab.clone(), warehouse, Arc::new(StubAnalyst), risk.clone());
    let service = CommandService::new(
        TieredExtractor::new(Box::new(BrokenModelTier)),
        dispatcher,
        risk,
    );

    let response = service
        .process_command("deploy feature-x to staging", Some("acme/widgets"))
        .await;

    // Degradation is invisible: the command still executes.
    assert_eq!(response.intent, Intent::DeployRequest);
    assert_eq!(response.action, "pipeline_triggered");
    assert!(response.executed);
}

#[tokio::test]
async fn gibberish_gets_guidance_not_an_error() {
    let h = harness();
    let response = h.service.process_command("qwerty asdf", None).await;

    assert_eq!(response.intent, Intent::Unknown);
    assert_eq!(response.action, "unknown");
    assert!(!response.executed);
    assert!(response.message.contains("help"));
}

#[tokio::test]
async fn prediction_entry_point_scores_deployment() {
    let h = harness();
    let prediction = h
        .service
        .predict_outcome(&PredictionInput {
            project_path: "acme/widgets".into(),
            ref_name: "main".into(),
            commit_files_count: 60,
            hour_of_day: Some(10),
            day_of_week: Some(2),
        })
        .await;

    // Mock warehouse default history: 720s mean, 20 samples. The large
    // change multiplies duration and bumps failure probability.
    assert_eq!(prediction.estimated_duration, 1080);
    assert_eq!(prediction.failure_probability, 0.2);
    assert_eq!(prediction.confidence, 0.8);
    assert!(prediction.failure_probability <= 0.95);
    assert!(
        prediction
            .risk_factors
            .iter()
            .any(|f| f.contains("files changed"))
    );
}

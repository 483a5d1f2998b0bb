//! Intent dispatch: one orchestration routine per intent.
//!
//! Each handler is its own error boundary. Collaborator exceptions are
//! caught, logged and folded into the response contract; nothing leaks
//! past the dispatcher except the two administrative pass-throughs
//! ([`ActionDispatcher::execute_pipeline`] and
//! [`ActionDispatcher::run_optimization`]), whose callers are expected
//! to handle transport errors themselves.
//!
//! Handlers produce an internal [`Outcome`] tagged union; the free-form
//! `action`/`data` strings of [`CommandResponse`] exist only at the
//! serialization boundary.

use serde_json::json;
use std::sync::Arc;

use drover_gitlab::GitLabClient;
use drover_protocol::analytics::{
    Anomaly, CostAnalysis, DeploymentWindow, OptimizationAnalysis, PipelineMetrics,
    TrendInsights,
};
use drover_protocol::commands::{CommandResponse, Entities, Intent};
use drover_protocol::pipelines::{PipelineSummary, PipelineVariable};
use drover_warehouse::WarehouseClient;

use crate::analyst::Analyst;
use crate::risk::{RiskScoringEngine, detect_anomalies};

/// Sentinel used when no project can be resolved. A deploy against it
/// is a validation error; informational handlers query it as-is and
/// surface whatever the collaborator says.
pub const DEFAULT_PROJECT: &str = "default-project";

const HELP_TEXT: &str = "Here are some commands you can try:\n\
• deploy to staging - Deploy the main branch to staging\n\
• deploy feature-xyz to production - Deploy a specific branch\n\
• check pipeline status - Get the status of the latest pipeline\n\
• optimize my pipeline - Get optimization suggestions\n\
• analyze my pipeline costs - Get cost breakdown and savings\n\
• show performance report - Get performance metrics and insights\n\
• fix failed job - Get suggestions to fix failures\n\
• schedule deployment for tomorrow - Schedule the optimal deployment time";

const UNKNOWN_TEXT: &str = "I didn't understand that command. Try: 'deploy to staging' or \
'check pipeline status' or ask for 'help'";

/// Internal result of one handler, before serialization.
enum Outcome {
    Triggered {
        pipeline: PipelineSummary,
        branch: String,
        environment: String,
    },
    PipelineError {
        errors: Vec<String>,
    },
    Status {
        status: String,
        message: String,
    },
    Optimization {
        analysis: OptimizationAnalysis,
    },
    Costs {
        project: String,
        analysis: CostAnalysis,
    },
    Performance {
        time_range: String,
        metrics: PipelineMetrics,
        insights: TrendInsights,
        anomalies: Vec<Anomaly>,
    },
    FixSuggested {
        job_name: String,
        fix: drover_protocol::analytics::FixSuggestion,
    },
    NoFailures,
    Scheduled {
        environment: String,
        window: DeploymentWindow,
    },
    NotImplemented {
        message: &'static str,
    },
    Help,
    Unknown,
    Error {
        message: String,
    },
}

impl Outcome {
    fn into_response(self, intent: Intent) -> CommandResponse {
        let (action, message, data, executed) = match self {
            Outcome::Triggered {
                pipeline,
                branch,
                environment,
            } => (
                "pipeline_triggered",
                format!(
                    "Deployment initiated! Pipeline {} started for {} → {}",
                    pipeline.iid, branch, environment
                ),
                serde_json::to_string(&json!({
                    "pipeline": {
                        "id": pipeline.id,
                        "webUrl": pipeline.web_url,
                        "status": pipeline.status,
                    }
                }))
                .ok(),
                true,
            ),
            Outcome::PipelineError { errors } => {
                ("pipeline_error", errors.join("\n"), None, false)
            }
            Outcome::Status { status, message } => (
                "status_retrieved",
                message.clone(),
                serde_json::to_string(&json!({ "status": status, "message": message })).ok(),
                true,
            ),
            Outcome::Optimization { analysis } => (
                "optimization_suggested",
                format!(
                    "Found optimizations that can save {}%:\n{}",
                    analysis.savings,
                    analysis.recommendations.join("\n")
                ),
                serde_json::to_string(&analysis).ok(),
                true,
            ),
            Outcome::Costs { project, analysis } => {
                let recommendations = analysis
                    .recommendations
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}. {r}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n");
                (
                    "cost_analysis",
                    format!(
                        "Cost Analysis for {project}:\n\n\
                         Current monthly cost: ${}\n\
                         Projected savings: ${} ({}%)\n\n\
                         Top recommendations:\n{recommendations}\n\n\
                         Estimated ROI: {}",
                        analysis.current_cost,
                        analysis.potential_savings,
                        analysis.savings_percentage,
                        analysis.roi
                    ),
                    serde_json::to_string(&analysis).ok(),
                    true,
                )
            }
            Outcome::Performance {
                time_range,
                metrics,
                insights,
                anomalies,
            } => {
                let mut anomaly_lines = insights.anomalies.clone();
                anomaly_lines.extend(anomalies.iter().map(|a| a.message.clone()));
                let anomaly_block = if anomaly_lines.is_empty() {
                    "None".to_string()
                } else {
                    anomaly_lines.join("\n")
                };
                (
                    "performance_report",
                    format!(
                        "Performance Report ({time_range}):\n\n\
                         Pipeline Success Rate: {}%\n\
                         Average Duration: {} minutes\n\
                         Total Runs: {}\n\n\
                         Insights:\n{}\n\n\
                         Anomalies Detected:\n{anomaly_block}",
                        metrics.success_rate,
                        metrics.avg_duration_mins,
                        metrics.total_runs,
                        insights.insights.join("\n")
                    ),
                    serde_json::to_string(&json!({
                        "report": metrics,
                        "insights": insights,
                        "anomalies": anomalies,
                    }))
                    .ok(),
                    true,
                )
            }
            Outcome::FixSuggested { job_name, fix } => (
                "fix_suggested",
                format!(
                    "Fix suggestion for job \"{job_name}\":\n\n\
                     Root Cause: {}\n\n\
                     Suggested Fix:\n{}\n\n\
                     Code Changes:\n```{}\n{}\n```\n\n\
                     Confidence: {}%",
                    fix.root_cause,
                    fix.recommendation,
                    fix.language.as_deref().unwrap_or("yaml"),
                    fix.code,
                    fix.confidence
                ),
                serde_json::to_string(&fix).ok(),
                true,
            ),
            Outcome::NoFailures => (
                "no_failures",
                "No failed jobs found. Everything is running smoothly!".to_string(),
                None,
                true,
            ),
            Outcome::Scheduled {
                environment,
                window,
            } => (
                "deployment_scheduled",
                format!(
                    "Deployment Scheduled:\n\n\
                     Environment: {environment}\n\
                     Optimal Time: {}\n\
                     Reason: {}\n\n\
                     Risk Assessment:\n\
                     - Traffic Impact: {}\n\
                     - Success Probability: {}%\n\
                     - Rollback Time: {} minutes\n\n\
                     The deployment will be triggered automatically at the scheduled time.",
                    window.suggested_time.to_rfc3339(),
                    window.reason,
                    window.traffic_impact,
                    window.success_probability,
                    window.estimated_rollback_mins
                ),
                serde_json::to_string(&window).ok(),
                true,
            ),
            Outcome::NotImplemented { message } => {
                ("not_implemented", message.to_string(), None, false)
            }
            Outcome::Help => ("help", HELP_TEXT.to_string(), None, true),
            Outcome::Unknown => ("unknown", UNKNOWN_TEXT.to_string(), None, false),
            Outcome::Error { message } => ("error", message, None, false),
        };

        CommandResponse {
            intent,
            action: action.to_string(),
            message,
            data,
            executed,
        }
    }
}

/// Maps an extracted intent to one orchestration routine.
pub struct ActionDispatcher {
    gitlab: Arc<dyn GitLabClient>,
    warehouse: Arc<dyn WarehouseClient>,
    analyst: Arc<dyn Analyst>,
    risk: RiskScoringEngine,
}

impl ActionDispatcher {
    pub fn new(
        gitlab: Arc<dyn GitLabClient>,
        warehouse: Arc<dyn WarehouseClient>,
        analyst: Arc<dyn Analyst>,
        risk: RiskScoringEngine,
    ) -> Self {
        Self {
            gitlab,
            warehouse,
            analyst,
            risk,
        }
    }

    /// Dispatch one extracted command. Always returns a well-formed
    /// response; collaborator failures become `action = "error"`.
    pub async fn dispatch(
        &self,
        intent: Intent,
        entities: &Entities,
        context: Option<&str>,
    ) -> CommandResponse {
        tracing::info!(intent = intent.as_str(), "dispatching command");

        let outcome = match intent {
            Intent::DeployRequest => self.handle_deploy(entities, context).await,
            Intent::StatusCheck => self.handle_status(entities, context).await,
            Intent::OptimizationRequest => self.handle_optimization(entities, context).await,
            Intent::CostAnalysis => self.handle_costs(entities, context).await,
            Intent::PerformanceReport => self.handle_performance(entities, context).await,
            Intent::AutoFix => self.handle_auto_fix(entities, context).await,
            Intent::ScheduleDeployment => self.handle_schedule(entities, context).await,
            Intent::PipelineCreate => Outcome::NotImplemented {
                message: "Pipeline creation is not implemented yet. \
                          Try: \"deploy to staging\" instead.",
            },
            Intent::RollbackRequest => Outcome::NotImplemented {
                message: "Rollback functionality is coming soon. For now, you can \
                          manually revert commits in GitLab.",
            },
            Intent::HelpRequest => Outcome::Help,
            Intent::Unknown => Outcome::Unknown,
        };

        outcome.into_response(intent)
    }

    /// Project slot, then caller context, then the sentinel.
    fn resolve_project(entities: &Entities, context: Option<&str>) -> String {
        entities
            .project
            .clone()
            .or_else(|| context.map(str::to_string))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string())
    }

    async fn handle_deploy(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);
        let branch = entities.branch.clone().unwrap_or_else(|| "main".into());
        let environment = entities
            .environment
            .clone()
            .unwrap_or_else(|| "staging".into());

        // Validation failure: no collaborator is contacted.
        if project == DEFAULT_PROJECT {
            return Outcome::Error {
                message: "Please specify a valid project path (e.g., \"username/project-name\")"
                    .into(),
            };
        }

        tracing::info!(%project, %branch, %environment, "triggering deployment");

        let variables = [
            PipelineVariable::new("ENVIRONMENT", &environment),
            PipelineVariable::new("AI_OPTIMIZED", "true"),
            PipelineVariable::new("TRIGGERED_BY", "drover"),
        ];

        match self
            .gitlab
            .trigger_pipeline(&project, &branch, &variables)
            .await
        {
            Ok(outcome) if !outcome.errors.is_empty() => Outcome::PipelineError {
                errors: outcome.errors,
            },
            Ok(outcome) => match outcome.pipeline {
                Some(pipeline) => Outcome::Triggered {
                    pipeline,
                    branch,
                    environment,
                },
                None => Outcome::Error {
                    message: "Deployment failed: provider returned no pipeline".into(),
                },
            },
            Err(e) => {
                tracing::error!(error = %e, %project, "deployment failed");
                Outcome::Error {
                    message: format!("Deployment failed: {e}"),
                }
            }
        }
    }

    async fn handle_status(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);

        match self.gitlab.get_pipeline_status(&project).await {
            Ok(status) => Outcome::Status {
                status: status.status,
                message: status.message,
            },
            Err(e) => {
                tracing::error!(error = %e, %project, "status check failed");
                Outcome::Error {
                    message: format!("Failed to check status: {e}"),
                }
            }
        }
    }

    async fn handle_optimization(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);

        match self.analyst.analyze_optimizations(&project).await {
            Ok(analysis) => Outcome::Optimization { analysis },
            Err(e) => {
                tracing::error!(error = %e, %project, "optimization analysis failed");
                Outcome::Error {
                    message: format!("Failed to analyze optimizations: {e}"),
                }
            }
        }
    }

    async fn handle_costs(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);

        match self.analyst.analyze_costs(&project).await {
            Ok(analysis) => Outcome::Costs { project, analysis },
            Err(e) => {
                tracing::error!(error = %e, %project, "cost analysis failed");
                Outcome::Error {
                    message: format!("Cost analysis failed: {e}"),
                }
            }
        }
    }

    async fn handle_performance(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);
        let time_range = entities
            .time_range
            .clone()
            .unwrap_or_else(|| "last_7_days".into());

        let metrics = match self.warehouse.get_pipeline_metrics(&project, &time_range).await {
            Ok(metrics) => metrics,
            Err(e) => {
                tracing::error!(error = %e, %project, "metrics query failed");
                return Outcome::Error {
                    message: format!("Performance report failed: {e}"),
                };
            }
        };

        let insights = match self.analyst.analyze_trends(&metrics).await {
            Ok(insights) => insights,
            Err(e) => {
                tracing::error!(error = %e, %project, "trend analysis failed");
                return Outcome::Error {
                    message: format!("Performance report failed: {e}"),
                };
            }
        };

        // Week-over-week anomalies ride along when trend rows are
        // available; the report degrades without them.
        let anomalies = match self.warehouse.get_pipeline_trends(&project).await {
            Ok(trends) => detect_anomalies(&trends),
            Err(e) => {
                tracing::warn!(error = %e, %project, "trend rows unavailable");
                Vec::new()
            }
        };

        Outcome::Performance {
            time_range,
            metrics,
            insights,
            anomalies,
        }
    }

    async fn handle_auto_fix(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);

        let failed_job = match self.gitlab.get_last_failed_job(&project).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, %project, "failed-job lookup failed");
                return Outcome::Error {
                    message: format!("Auto-fix analysis failed: {e}"),
                };
            }
        };

        let job = match (&entities.job_id, failed_job) {
            // Explicit job id must match the most recent failure.
            (Some(job_id), Some(job)) if job.id == *job_id => job,
            (Some(job_id), _) => {
                return Outcome::Error {
                    message: format!("Job {job_id} is not among the recent failed jobs"),
                };
            }
            (None, Some(job)) => job,
            (None, None) => return Outcome::NoFailures,
        };

        match self.analyst.analyze_failure(&job.log, &job.config).await {
            Ok(fix) => Outcome::FixSuggested {
                job_name: job.name,
                fix,
            },
            Err(e) => {
                tracing::error!(error = %e, %project, "failure analysis failed");
                Outcome::Error {
                    message: format!("Auto-fix analysis failed: {e}"),
                }
            }
        }
    }

    async fn handle_schedule(&self, entities: &Entities, context: Option<&str>) -> Outcome {
        let project = Self::resolve_project(entities, context);
        let environment = entities
            .environment
            .clone()
            .unwrap_or_else(|| "staging".into());
        let preferred_time = entities
            .time
            .clone()
            .unwrap_or_else(|| "next_maintenance_window".into());

        let window = self
            .risk
            .optimal_deployment_window(&project, &preferred_time)
            .await;

        Outcome::Scheduled {
            environment,
            window,
        }
    }

    /// Direct pipeline execution. Administrative pass-through: logs
    /// and re-raises instead of wrapping into a response.
    pub async fn execute_pipeline(
        &self,
        project_path: &str,
        branch: Option<&str>,
        variables: &[PipelineVariable],
    ) -> anyhow::Result<PipelineSummary> {
        let outcome = self
            .gitlab
            .trigger_pipeline(project_path, branch.unwrap_or("main"), variables)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %project_path, "execute pipeline failed"))?;

        if !outcome.errors.is_empty() {
            anyhow::bail!(outcome.errors.join("\n"));
        }
        outcome
            .pipeline
            .ok_or_else(|| anyhow::anyhow!("provider returned no pipeline"))
    }

    /// Direct pipeline optimization. Same pass-through contract as
    /// [`Self::execute_pipeline`].
    pub async fn run_optimization(
        &self,
        project_path: &str,
        pipeline_id: &str,
        optimization_kind: &str,
    ) -> anyhow::Result<OptimizationAnalysis> {
        self.analyst
            .optimize_pipeline(project_path, pipeline_id, optimization_kind)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %project_path, "optimization failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use drover_gitlab::{GitLabError, MockGitLab};
    use drover_protocol::analytics::FixSuggestion;
    use drover_protocol::pipelines::{FailedJob, PipelineStatus, TriggerOutcome};
    use drover_warehouse::MockWarehouse;

    /// Scripted analyst; slots default to the protocol defaults.
    #[derive(Default)]
    struct MockAnalyst {
        fail_with: Option<String>,
        fix: Mutex<Option<FixSuggestion>>,
    }

    impl MockAnalyst {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.into()),
                fix: Mutex::new(None),
            }
        }

        fn check(&self) -> anyhow::Result<()> {
            match &self.fail_with {
                Some(message) => Err(anyhow::anyhow!("{message}")),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Analyst for MockAnalyst {
        async fn analyze_optimizations(
            &self,
            _project_path: &str,
        ) -> anyhow::Result<OptimizationAnalysis> {
            self.check()?;
            Ok(OptimizationAnalysis::default())
        }

        async fn optimize_pipeline(
            &self,
            _project_path: &str,
            _pipeline_id: &str,
            _optimization_kind: &str,
        ) -> anyhow::Result<OptimizationAnalysis> {
            self.check()?;
            Ok(OptimizationAnalysis::default())
        }

        async fn analyze_costs(&self, _project_path: &str) -> anyhow::Result<CostAnalysis> {
            self.check()?;
            Ok(CostAnalysis::default())
        }

        async fn analyze_failure(
            &self,
            _log: &str,
            _config: &str,
        ) -> anyhow::Result<FixSuggestion> {
            self.check()?;
            Ok(self.fix.lock().unwrap().clone().unwrap_or_default())
        }

        async fn analyze_trends(
            &self,
            _metrics: &PipelineMetrics,
        ) -> anyhow::Result<TrendInsights> {
            self.check()?;
            Ok(TrendInsights::default())
        }
    }

    struct Fixture {
        gitlab: Arc<MockGitLab>,
        dispatcher: ActionDispatcher,
    }

    fn fixture_with(gitlab: MockGitLab, analyst: MockAnalyst) -> Fixture {
        let gitlab = Arc::new(gitlab);
        let warehouse = Arc::new(MockWarehouse::new());
        let risk = RiskScoringEngine::new(warehouse.clone());
        let dispatcher = ActionDispatcher::new(
            gitlab.clone(),
            warehouse,
            Arc::new(analyst),
            risk,
        );
        Fixture { gitlab, dispatcher }
    }

    fn fixture() -> Fixture {
        fixture_with(MockGitLab::with_pipeline("42"), MockAnalyst::default())
    }

    fn entities() -> Entities {
        Entities::default()
    }

    // ── deploy ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn deploy_without_project_is_validation_error() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::DeployRequest, &entities(), None)
            .await;

        assert_eq!(response.action, "error");
        assert!(!response.executed);
        // Validation failures never reach the collaborator.
        assert_eq!(f.gitlab.trigger_calls().len(), 0);
    }

    #[tokio::test]
    async fn deploy_uses_context_project_and_slot_defaults() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::DeployRequest, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "pipeline_triggered");
        assert!(response.executed);
        assert!(response.message.contains("Pipeline 42"));

        let calls = f.gitlab.trigger_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "acme/widgets");
        assert_eq!(calls[0].ref_name, "main");
        let env = calls[0]
            .variables
            .iter()
            .find(|v| v.key == "ENVIRONMENT")
            .unwrap();
        assert_eq!(env.value, "staging");
    }

    #[tokio::test]
    async fn deploy_carries_branch_and_environment_slots() {
        let f = fixture();
        let mut e = entities();
        e.project = Some("acme/widgets".into());
        e.branch = Some("feature-x".into());
        e.environment = Some("production".into());

        let response = f.dispatcher.dispatch(Intent::DeployRequest, &e, None).await;
        assert!(response.message.contains("feature-x → production"));

        let calls = f.gitlab.trigger_calls();
        assert_eq!(calls[0].ref_name, "feature-x");
    }

    #[tokio::test]
    async fn deploy_domain_errors_become_pipeline_error() {
        let gitlab = MockGitLab::new();
        gitlab.set_trigger(Ok(TriggerOutcome {
            pipeline: None,
            errors: vec!["branch not found".into()],
        }));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let mut e = entities();
        e.project = Some("acme/widgets".into());
        let response = f.dispatcher.dispatch(Intent::DeployRequest, &e, None).await;

        assert_eq!(response.action, "pipeline_error");
        assert_eq!(response.message, "branch not found");
        assert!(!response.executed);
    }

    #[tokio::test]
    async fn deploy_transport_error_is_wrapped() {
        let gitlab = MockGitLab::new();
        gitlab.set_trigger(Err(GitLabError::Api {
            status: 502,
            body: "bad gateway".into(),
        }));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let mut e = entities();
        e.project = Some("acme/widgets".into());
        let response = f.dispatcher.dispatch(Intent::DeployRequest, &e, None).await;

        assert_eq!(response.action, "error");
        assert!(response.message.starts_with("Deployment failed:"));
        assert!(!response.executed);
    }

    // ── status ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn status_check_queries_context_project() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::StatusCheck, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "status_retrieved");
        assert!(response.executed);
        assert_eq!(f.gitlab.status_calls(), vec!["acme/widgets".to_string()]);
    }

    #[tokio::test]
    async fn status_without_project_uses_sentinel() {
        let gitlab = MockGitLab::new();
        gitlab.set_status(Ok(PipelineStatus {
            status: "none".into(),
            message: "No pipelines found".into(),
        }));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let response = f
            .dispatcher
            .dispatch(Intent::StatusCheck, &entities(), None)
            .await;
        assert!(response.executed);
        assert_eq!(f.gitlab.status_calls(), vec![DEFAULT_PROJECT.to_string()]);
    }

    // ── analyses ────────────────────────────────────────────────────

    #[tokio::test]
    async fn optimization_formats_savings() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::OptimizationRequest, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "optimization_suggested");
        assert!(response.message.contains("save 60%"));
        assert!(response.executed);
    }

    #[tokio::test]
    async fn cost_analysis_numbers_recommendations() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::CostAnalysis, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "cost_analysis");
        assert!(response.message.contains("1. Enable advanced caching strategies"));
        assert!(response.message.contains("Estimated ROI: 2 months"));
    }

    #[tokio::test]
    async fn analyst_failure_is_wrapped_not_raised() {
        let f = fixture_with(MockGitLab::new(), MockAnalyst::failing("model down"));
        let response = f
            .dispatcher
            .dispatch(Intent::CostAnalysis, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "error");
        assert!(response.message.contains("model down"));
        assert!(!response.executed);
    }

    #[tokio::test]
    async fn performance_report_defaults_time_range() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::PerformanceReport, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "performance_report");
        assert!(response.message.contains("Performance Report (last_7_days)"));
        assert!(response.message.contains("Anomalies Detected:\nNone"));
        assert!(response.executed);
    }

    // ── auto fix ────────────────────────────────────────────────────

    #[tokio::test]
    async fn auto_fix_without_failures_is_success() {
        let f = fixture(); // mock default: no failed job
        let response = f
            .dispatcher
            .dispatch(Intent::AutoFix, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "no_failures");
        assert!(response.executed);
    }

    fn failed_job() -> FailedJob {
        FailedJob {
            id: "991".into(),
            name: "test:unit".into(),
            log: "assertion failed".into(),
            config: "test:unit: {script: cargo test}".into(),
        }
    }

    #[tokio::test]
    async fn auto_fix_analyzes_last_failed_job() {
        let gitlab = MockGitLab::new();
        gitlab.set_failed_job(Ok(Some(failed_job())));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let response = f
            .dispatcher
            .dispatch(Intent::AutoFix, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "fix_suggested");
        assert!(response.message.contains("test:unit"));
        assert!(response.message.contains("```yaml"));
        assert!(response.executed);
    }

    #[tokio::test]
    async fn auto_fix_with_mismatched_job_id_is_validation_error() {
        let gitlab = MockGitLab::new();
        gitlab.set_failed_job(Ok(Some(failed_job())));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let mut e = entities();
        e.job_id = Some("123".into());
        let response = f
            .dispatcher
            .dispatch(Intent::AutoFix, &e, Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "error");
        assert!(response.message.contains("123"));
        assert!(!response.executed);
    }

    #[tokio::test]
    async fn auto_fix_with_matching_job_id_proceeds() {
        let gitlab = MockGitLab::new();
        gitlab.set_failed_job(Ok(Some(failed_job())));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let mut e = entities();
        e.job_id = Some("991".into());
        let response = f
            .dispatcher
            .dispatch(Intent::AutoFix, &e, Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "fix_suggested");
    }

    // ── schedule / static branches ──────────────────────────────────

    #[tokio::test]
    async fn schedule_reports_window() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::ScheduleDeployment, &entities(), Some("acme/widgets"))
            .await;

        assert_eq!(response.action, "deployment_scheduled");
        assert!(response.message.contains("Environment: staging"));
        assert!(response.executed);
    }

    #[tokio::test]
    async fn unimplemented_intents() {
        let f = fixture();
        for intent in [Intent::PipelineCreate, Intent::RollbackRequest] {
            let response = f.dispatcher.dispatch(intent, &entities(), None).await;
            assert_eq!(response.action, "not_implemented");
            assert!(!response.executed);
        }
    }

    #[tokio::test]
    async fn help_lists_commands() {
        let f = fixture();
        let response = f
            .dispatcher
            .dispatch(Intent::HelpRequest, &entities(), None)
            .await;

        assert_eq!(response.action, "help");
        assert!(response.message.contains("deploy to staging"));
        assert!(response.executed);
    }

    #[tokio::test]
    async fn unknown_intent_gives_guidance() {
        let f = fixture();
        let response = f.dispatcher.dispatch(Intent::Unknown, &entities(), None).await;
        assert_eq!(response.action, "unknown");
        assert!(!response.executed);
    }

    // ── pass-throughs ───────────────────────────────────────────────

    #[tokio::test]
    async fn execute_pipeline_re_raises_domain_errors() {
        let gitlab = MockGitLab::new();
        gitlab.set_trigger(Ok(TriggerOutcome {
            pipeline: None,
            errors: vec!["ref is ambiguous".into()],
        }));
        let f = fixture_with(gitlab, MockAnalyst::default());

        let err = f
            .dispatcher
            .execute_pipeline("acme/widgets", Some("main"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ref is ambiguous"));
    }

    #[tokio::test]
    async fn execute_pipeline_returns_summary() {
        let f = fixture();
        let pipeline = f
            .dispatcher
            .execute_pipeline("acme/widgets", None, &[])
            .await
            .unwrap();
        assert_eq!(pipeline.iid, "42");
    }

    #[tokio::test]
    async fn run_optimization_re_raises() {
        let f = fixture_with(MockGitLab::new(), MockAnalyst::failing("quota exceeded"));
        let err = f
            .dispatcher
            .run_optimization("acme/widgets", "42", "speed")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}

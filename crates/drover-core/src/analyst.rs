//! Generative analysis collaborator.
//!
//! The dispatcher asks the [`Analyst`] for optimization, cost, failure
//! and trend analyses; [`GenerativeAnalyst`] prompts the text model and
//! parses the first JSON object out of the answer. A model that answers
//! in prose gets the conservative default payload for that analysis; a
//! model that cannot be reached at all is an error the dispatcher wraps
//! into its response contract.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use drover_protocol::analytics::{
    CostAnalysis, FixSuggestion, OptimizationAnalysis, PipelineMetrics, TrendInsights,
};

use crate::llm::TextGenerator;

/// Analysis operations backed by the generative model.
#[async_trait]
pub trait Analyst: Send + Sync {
    /// Pipeline optimization suggestions for a project.
    async fn analyze_optimizations(&self, project_path: &str)
    -> anyhow::Result<OptimizationAnalysis>;

    /// Targeted optimization of one pipeline (administrative mutation).
    async fn optimize_pipeline(
        &self,
        project_path: &str,
        pipeline_id: &str,
        optimization_kind: &str,
    ) -> anyhow::Result<OptimizationAnalysis>;

    /// Monthly cost breakdown with projected savings.
    async fn analyze_costs(&self, project_path: &str) -> anyhow::Result<CostAnalysis>;

    /// Root-cause analysis of a failed job from its log and CI config.
    async fn analyze_failure(&self, log: &str, config: &str) -> anyhow::Result<FixSuggestion>;

    /// Free-text insights over aggregate metrics.
    async fn analyze_trends(&self, metrics: &PipelineMetrics) -> anyhow::Result<TrendInsights>;
}

/// [`Analyst`] backed by a [`TextGenerator`].
pub struct GenerativeAnalyst {
    model: Arc<dyn TextGenerator>,
}

impl GenerativeAnalyst {
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        Self { model }
    }

    /// Prompt the model and parse the first JSON object in its answer.
    /// Prose or partial JSON degrades to `T::default()`; only transport
    /// failures are errors.
    async fn prompt_for<T>(&self, prompt: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let output = self.model.generate(prompt).await?;
        match first_json(&output).and_then(|json| serde_json::from_str(json).ok()) {
            Some(parsed) => Ok(parsed),
            None => {
                tracing::warn!("model answered without usable JSON, using default analysis");
                Ok(T::default())
            }
        }
    }
}

/// First `{`..last `}` span in the text, fences ignored.
fn first_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

#[async_trait]
impl Analyst for GenerativeAnalyst {
    async fn analyze_optimizations(
        &self,
        project_path: &str,
    ) -> anyhow::Result<OptimizationAnalysis> {
        let prompt = format!(
            "Analyze the CI/CD pipelines of GitLab project {project_path} and suggest \
             optimizations.\n\nConsider caching, parallelization, runner sizing and \
             container image weight.\n\nRespond ONLY with JSON:\n\
             {{\"originalCost\": number, \"optimizedCost\": number, \"savings\": number (percentage), \
             \"recommendations\": string[]}}"
        );
        self.prompt_for(&prompt).await
    }

    async fn optimize_pipeline(
        &self,
        project_path: &str,
        pipeline_id: &str,
        optimization_kind: &str,
    ) -> anyhow::Result<OptimizationAnalysis> {
        let prompt = format!(
            "Optimize pipeline {pipeline_id} of GitLab project {project_path} for \
             {optimization_kind}.\n\nRespond ONLY with JSON:\n\
             {{\"originalCost\": number, \"optimizedCost\": number, \"savings\": number (percentage), \
             \"recommendations\": string[]}}"
        );
        self.prompt_for(&prompt).await
    }

    async fn analyze_costs(&self, project_path: &str) -> anyhow::Result<CostAnalysis> {
        let prompt = format!(
            "Analyze the CI/CD pipeline costs for GitLab project {project_path} and provide \
             optimization recommendations.\n\nConsider runner usage patterns, resource \
             allocation, caching opportunities and artifact storage.\n\nRespond ONLY with JSON:\n\
             {{\"currentCost\": number, \"potentialSavings\": number, \"savingsPercentage\": number, \
             \"recommendations\": string[], \"roi\": string}}"
        );
        self.prompt_for(&prompt).await
    }

    async fn analyze_failure(&self, log: &str, config: &str) -> anyhow::Result<FixSuggestion> {
        let prompt = format!(
            "Analyze this failed GitLab CI/CD job and provide a solution.\n\n\
             Job configuration:\n{config}\n\nJob log (tail):\n{log}\n\n\
             Respond ONLY with JSON:\n\
             {{\"rootCause\": string, \"recommendation\": string, \"language\": string, \
             \"code\": string, \"confidence\": number (0-100)}}"
        );
        self.prompt_for(&prompt).await
    }

    async fn analyze_trends(&self, metrics: &PipelineMetrics) -> anyhow::Result<TrendInsights> {
        let prompt = format!(
            "Analyze these CI/CD pipeline performance metrics and provide insights.\n\n\
             Metrics: {}\n\nIdentify trends, unusual patterns, bottlenecks and optimization \
             opportunities.\n\nRespond ONLY with JSON:\n\
             {{\"insights\": string[], \"anomalies\": string[], \"bottlenecks\": string[], \
             \"recommendations\": string[]}}",
            serde_json::to_string(metrics)?
        );
        self.prompt_for(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedModel {
        output: Result<String, String>,
    }

    impl ScriptedModel {
        fn answering(output: &str) -> Arc<Self> {
            Arc::new(Self {
                output: Ok(output.into()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                output: Err(message.into()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            match &self.output {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow::anyhow!("{message}")),
            }
        }
    }

    fn metrics() -> PipelineMetrics {
        PipelineMetrics {
            total_runs: 100,
            successful_runs: 85,
            failed_runs: 15,
            success_rate: 85.0,
            avg_duration_mins: 12.0,
        }
    }

    #[tokio::test]
    async fn parses_cost_analysis_json() {
        let analyst = GenerativeAnalyst::new(ScriptedModel::answering(
            r#"{"currentCost": 250.0, "potentialSavings": 90.0, "savingsPercentage": 36.0,
                "recommendations": ["cache node_modules"], "roi": "6 weeks"}"#,
        ));
        let analysis = analyst.analyze_costs("acme/widgets").await.unwrap();
        assert_eq!(analysis.current_cost, 250.0);
        assert_eq!(analysis.roi, "6 weeks");
    }

    #[tokio::test]
    async fn prose_answer_falls_back_to_defaults() {
        let analyst = GenerativeAnalyst::new(ScriptedModel::answering(
            "Your pipelines look fine to me, nothing to optimize.",
        ));
        let analysis = analyst.analyze_costs("acme/widgets").await.unwrap();
        assert_eq!(analysis.roi, "2 months"); // default payload
    }

    #[tokio::test]
    async fn failure_analysis_parses_fenced_json() {
        let analyst = GenerativeAnalyst::new(ScriptedModel::answering(
            "```json\n{\"rootCause\": \"OOM in test stage\", \"recommendation\": \"raise memory limit\", \"language\": \"yaml\", \"code\": \"memory: 4Gi\", \"confidence\": 85}\n```",
        ));
        let fix = analyst.analyze_failure("killed", "test: {}").await.unwrap();
        assert_eq!(fix.root_cause, "OOM in test stage");
        assert_eq!(fix.language.as_deref(), Some("yaml"));
    }

    #[tokio::test]
    async fn trends_partial_json_fills_defaults() {
        let analyst = GenerativeAnalyst::new(ScriptedModel::answering(
            r#"{"insights": ["success rate trending up"]}"#,
        ));
        let insights = analyst.analyze_trends(&metrics()).await.unwrap();
        assert_eq!(insights.insights.len(), 1);
        assert!(insights.anomalies.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let analyst = GenerativeAnalyst::new(ScriptedModel::failing("connection refused"));
        let result = analyst.analyze_trends(&metrics()).await;
        assert!(result.is_err());
    }
}
